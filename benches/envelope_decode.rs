//! Frame decoding and status update benchmarks.
//!
//! Benchmarks the hot path of the receive loop and the poll:
//! - Array frames of 1, 10 and 100 events
//! - Message frames with several keys
//! - Correlated status updates through a no-op gateway
//!
//! Run with: cargo bench --bench envelope_decode
//! Results saved to: target/criterion/

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use octoprint_bridge::protocol::decode_events;
use octoprint_bridge::{
    ChatGateway, Delivery, JobStatus, LogicalKey, MessageComposer, MessageId, OutboundMessage,
    Result, RoomId,
};
use serde_json::json;
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const EVENT_COUNTS: &[usize] = &[1, 10, 100];

// ============================================================================
// Fixtures
// ============================================================================

fn array_frame(count: usize) -> String {
    let events: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "event": {
                    "type": "ZChange",
                    "payload": { "new": i as f64 * 0.2, "old": null }
                }
            })
        })
        .collect();
    format!("a{}", serde_json::Value::Array(events))
}

fn message_frame() -> String {
    format!(
        "m{}",
        json!({
            "connected": { "version": "1.10.0", "safe_mode": false },
            "history": { "state": { "text": "Printing" } },
            "event": { "type": "PrintStarted", "payload": { "name": "cube.gcode" } }
        })
    )
}

/// Gateway that accepts everything.
struct NullGateway {
    next_id: AtomicUsize,
}

#[async_trait]
impl ChatGateway for NullGateway {
    async fn send(&self, _message: &OutboundMessage) -> Result<Vec<Delivery>> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(vec![Delivery::new(RoomId::new("!bench"), MessageId::new(format!("${n}")))])
    }

    async fn edit(&self, _id: &MessageId, _room: &RoomId, _message: &OutboundMessage) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Benchmark: Frame Decoding
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for &count in EVENT_COUNTS {
        let frame = array_frame(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("array", count), &frame, |b, frame| {
            b.iter(|| decode_events(frame));
        });
    }

    let frame = message_frame();
    group.throughput(Throughput::Elements(3));
    group.bench_function("message", |b| b.iter(|| decode_events(&frame)));

    group.bench_function("garbage", |b| b.iter(|| decode_events("x[not json")));

    group.finish();
}

// ============================================================================
// Benchmark: Status Updates
// ============================================================================

fn bench_status_update(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let gateway = Arc::new(NullGateway {
        next_id: AtomicUsize::new(0),
    });
    let composer = MessageComposer::new(gateway, None);
    let key = LogicalKey::job_status();
    let job = JobStatus::from_value(json!({
        "state": "Printing",
        "job": { "file": { "name": "cube.gcode", "size": 1_234_567 } },
        "progress": { "completion": 42.5, "printTime": 3_600, "printTimeLeft": 5_400 }
    }))
    .unwrap();

    let mut group = c.benchmark_group("status_update");

    group.bench_function("compose", |b| b.iter(|| composer.job_update(&job)));

    group.bench_function("send_or_edit", |b| {
        b.to_async(&rt).iter(|| async {
            let message = composer.job_update(&job);
            composer.send_or_edit(&key, &message).await.unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_status_update);
criterion_main!(benches);
