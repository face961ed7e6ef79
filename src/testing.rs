//! In-memory fakes of the chat gateway and controller REST API.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use crate::chat::{ChatGateway, Delivery, OutboundMessage};
use crate::error::{Error, Result};
use crate::identifiers::{MessageId, RoomId};
use crate::protocol::JobStatus;
use crate::session::{LoginRequest, Session};
use crate::transport::ControllerApi;

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber filtered by `RUST_LOG`. Safe to call twice.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// FakeGateway
// ============================================================================

/// Records sends and edits; hands out sequential message ids.
pub(crate) struct FakeGateway {
    rooms: Vec<RoomId>,
    sent: Mutex<Vec<OutboundMessage>>,
    edits: Mutex<Vec<(MessageId, RoomId, OutboundMessage)>>,
    next_id: AtomicUsize,
    fail_edits: AtomicBool,
    latency: Option<Duration>,
}

impl FakeGateway {
    pub(crate) fn new(rooms: &[&str]) -> Self {
        Self {
            rooms: rooms.iter().copied().map(RoomId::new).collect(),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            fail_edits: AtomicBool::new(false),
            latency: None,
        }
    }

    pub(crate) fn with_latency(mut self) -> Self {
        self.latency = Some(Duration::from_millis(5));
        self
    }

    pub(crate) fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    pub(crate) fn edits(&self) -> Vec<(MessageId, RoomId, OutboundMessage)> {
        self.edits.lock().clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<Vec<Delivery>> {
        self.delay().await;
        self.sent.lock().push(message.clone());

        Ok(self
            .rooms
            .iter()
            .filter(|room| message.target_room.as_ref().is_none_or(|target| target == *room))
            .map(|room| {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst);
                Delivery::new(room.clone(), format!("${n}"))
            })
            .collect())
    }

    async fn edit(
        &self,
        message_id: &MessageId,
        room: &RoomId,
        message: &OutboundMessage,
    ) -> Result<()> {
        self.delay().await;
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::chat("M_FORBIDDEN"));
        }
        self.edits
            .lock()
            .push((message_id.clone(), room.clone(), message.clone()));
        Ok(())
    }
}

// ============================================================================
// FakeApi
// ============================================================================

/// Records logins; serves a configurable job status.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub(crate) logins: Mutex<Vec<LoginRequest>>,
    pub(crate) logouts: AtomicUsize,
    pub(crate) job_fetches: AtomicUsize,
    pub(crate) reject_logins: AtomicBool,
    pub(crate) fail_logout: AtomicBool,
    pub(crate) login_delay: Option<Duration>,
    /// `None` makes `job` fail.
    pub(crate) job: Mutex<Option<JobStatus>>,
}

impl FakeApi {
    pub(crate) fn with_job(job: JobStatus) -> Self {
        Self {
            job: Mutex::new(Some(job)),
            ..Self::default()
        }
    }

    pub(crate) fn set_job(&self, job: Option<JobStatus>) {
        *self.job.lock() = job;
    }

    pub(crate) fn logins(&self) -> Vec<LoginRequest> {
        self.logins.lock().clone()
    }
}

#[async_trait]
impl ControllerApi for FakeApi {
    async fn login(&self, request: &LoginRequest) -> Result<Session> {
        if let Some(delay) = self.login_delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject_logins.load(Ordering::SeqCst) {
            return Err(Error::auth("HTTP 403 from /api/login"));
        }

        let mut logins = self.logins.lock();
        logins.push(request.clone());
        Ok(Session::new("alice", format!("token-{}", logins.len())))
    }

    async fn logout(&self) -> Result<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(Error::connection("socket reset"));
        }
        Ok(())
    }

    async fn job(&self) -> Result<JobStatus> {
        self.job_fetches.fetch_add(1, Ordering::SeqCst);
        self.job
            .lock()
            .clone()
            .ok_or_else(|| Error::http_status(502, "/api/job"))
    }
}
