//! Bridge a controller into a console "room".
//!
//! Demonstrates:
//! - Implementing `ChatGateway` for a transport
//! - Building a bridge from environment settings
//! - Running with reconnects, or a single session with `--once`
//!
//! Usage:
//!   OCTOPRINT_API_KEY=... cargo run --example 001_bridge
//!   OCTOPRINT_USER=... OCTOPRINT_PASSWORD=... cargo run --example 001_bridge
//!   cargo run --example 001_bridge -- --once
//!   cargo run --example 001_bridge -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use common::{Args, Controller};
use octoprint_bridge::{
    Bridge, ChatGateway, Delivery, MessageId, OutboundMessage, Result, RoomId,
};

// ============================================================================
// Console Gateway
// ============================================================================

/// Prints every message instead of posting it.
#[derive(Debug, Default)]
struct ConsoleGateway {
    next_id: AtomicU64,
}

#[async_trait]
impl ChatGateway for ConsoleGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<Vec<Delivery>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let room = message
            .target_room
            .clone()
            .unwrap_or_else(|| RoomId::new("!console"));

        println!("[send {id}] {room}");
        println!("    {}", message.plain_body);
        Ok(vec![Delivery::new(room, format!("$console-{id}"))])
    }

    async fn edit(
        &self,
        message_id: &MessageId,
        room: &RoomId,
        message: &OutboundMessage,
    ) -> Result<()> {
        println!("[edit {message_id}] {room}");
        println!("    {}", message.plain_body);
        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Bridge ===\n");

    // ========================================================================
    // Build Bridge
    // ========================================================================

    let controller = Controller::from_env();
    println!("[1] Building bridge...");
    println!("    Controller: {}", controller.url);

    let mut builder = Bridge::builder()
        .base_url(&controller.url)
        .gateway(Arc::new(ConsoleGateway::default()));
    if let Some(key) = &controller.api_key {
        builder = builder.api_key(key);
    }
    if let (Some(user), Some(password)) = (&controller.user, &controller.password) {
        builder = builder.credentials(user, password);
    }

    let bridge = builder.build()?;
    println!("    ✓ Bridge ready\n");

    // ========================================================================
    // Run
    // ========================================================================

    if args.once {
        println!("[2] Connecting once...");
        bridge.connect().await?;
        println!("    ✓ Connected, state: {}\n", bridge.state());

        let outcome = tokio::select! {
            outcome = bridge.closed() => outcome,
            _ = tokio::signal::ctrl_c() => Ok(()),
        };

        println!("\n[Cleanup] Disconnecting...");
        bridge.disconnect().await;
        println!("          ✓ Done");
        return outcome;
    }

    println!("[2] Running (Ctrl+C to exit)...\n");
    tokio::select! {
        outcome = bridge.run() => outcome?,
        _ = tokio::signal::ctrl_c() => {}
    }

    println!("\n[Cleanup] Disconnecting...");
    bridge.disconnect().await;
    println!("          ✓ Done");

    Ok(())
}
