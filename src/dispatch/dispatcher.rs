//! Event dispatcher.
//!
//! Routes decoded controller events to handlers, first by message kind,
//! then by print event type.
//!
//! # Routing
//!
//! | Message | Handling |
//! |---------|----------|
//! | `connected` | send auth + throttle frames, become `Authenticated` |
//! | `reauthRequired` | reauthenticate, resend auth frame |
//! | `PrintStarted` | fetch job, send "print started", arm poll timer |
//! | `PrintDone` | send "print done", end job |
//! | `PrintFailed`, `PrintCancelled` | end job |
//! | `PrintCancelling`, `PrintPaused`, `PrintResumed` | logged |
//! | anything else | ignored |
//!
//! Ending a job disarms the poll timer and invalidates the job status
//! correlation. No handler error escapes [`Dispatcher::dispatch`]; an auth
//! failure is handed to the socket loop instead, which closes the
//! connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::compose::MessageComposer;
use crate::error::{Error, Result};
use crate::identifiers::LogicalKey;
use crate::protocol::{
    ControlFrame, ControllerEvent, JobStatus, ParsedMessage, PrintEvent, PrintPayload,
    encode_control,
};
use crate::session::SessionManager;
use crate::transport::{CommandSender, ConnectionCommand};

use super::timer::{PollTimer, TickOutcome};

// ============================================================================
// Constants
// ============================================================================

/// Default throttle factor sent after auth.
pub const DEFAULT_THROTTLE: u32 = 10;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle of the controller connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket.
    #[default]
    Disconnected,
    /// Logging in and opening the socket.
    Connecting,
    /// Socket open, waiting for `connected`.
    AwaitingAuthAck,
    /// Auth frame sent.
    Authenticated,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingAuthAck => "awaiting auth ack",
            Self::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Context shared by every handler.
pub struct Dispatcher {
    /// Session owner.
    session: Arc<SessionManager>,
    /// Composer and correlation table.
    composer: Arc<MessageComposer>,
    /// Job status poll.
    timer: PollTimer,
    /// Socket loop of the current connection.
    link: Mutex<Option<CommandSender>>,
    /// Connection state.
    state: Mutex<ConnectionState>,
    /// Throttle factor sent after auth.
    throttle: u32,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &*self.state.lock())
            .field("polling", &self.timer.is_armed())
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher in the `Disconnected` state.
    #[must_use]
    pub fn new(
        session: Arc<SessionManager>,
        composer: Arc<MessageComposer>,
        poll_interval: Duration,
        throttle: u32,
    ) -> Self {
        Self {
            session,
            composer,
            timer: PollTimer::new(poll_interval),
            link: Mutex::new(None),
            state: Mutex::new(ConnectionState::Disconnected),
            throttle,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Sets the connection state.
    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    /// Returns `true` while a job status poll is armed.
    #[inline]
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.timer.is_armed()
    }

    /// Binds to a freshly opened socket.
    pub fn attach(&self, link: CommandSender) {
        *self.link.lock() = Some(link);
        self.set_state(ConnectionState::AwaitingAuthAck);
    }

    /// Releases the socket and drops all job state.
    pub fn detach(&self) {
        self.link.lock().take();
        self.timer.disarm();
        self.composer.invalidate_all();
        self.set_state(ConnectionState::Disconnected);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Handles one controller event.
    pub async fn dispatch(&self, event: ControllerEvent) {
        match event.parse() {
            ParsedMessage::Connected => self.on_connected().await,
            ParsedMessage::ReauthRequired { reason } => self.on_reauth_required(&reason).await,
            ParsedMessage::Event(print) => self.on_print_event(print).await,
            ParsedMessage::Unknown { kind } => trace!(kind = %kind, "Ignoring message"),
        }
    }

    async fn on_connected(&self) {
        let session = match self.session.current().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Socket connected without a session");
                self.fail(e);
                return;
            }
        };

        let sent = self
            .send_frame(&ControlFrame::auth(&session))
            .and_then(|()| self.send_frame(&ControlFrame::throttle(self.throttle)));

        match sent {
            Ok(()) => {
                self.set_state(ConnectionState::Authenticated);
                info!(user = %session.name, "Controller socket authenticated");
            }
            Err(e) => warn!(error = %e, "Failed to send auth frame"),
        }
    }

    async fn on_reauth_required(&self, reason: &str) {
        match self.session.reauthenticate(reason).await {
            Ok(session) => {
                if let Err(e) = self.send_frame(&ControlFrame::auth(&session)) {
                    warn!(error = %e, "Failed to resend auth frame");
                }
            }
            Err(e) => {
                error!(error = %e, reason, "Reauthentication failed, going silent");
                self.end_job();
                self.fail(e);
            }
        }
    }

    async fn on_print_event(&self, event: PrintEvent) {
        debug!(event_type = event.event_type(), "Print event");

        match &event {
            PrintEvent::Started(payload) => self.on_print_started(payload).await,
            PrintEvent::Done(payload) => self.on_print_done(payload).await,
            PrintEvent::Other { event_type } => trace!(event_type = %event_type, "Ignoring event"),
            ended if ended.ends_job() => {
                info!(event_type = ended.event_type(), "Job ended");
                self.end_job();
            }
            changed => info!(event_type = changed.event_type(), "Job state changed"),
        }
    }

    async fn on_print_started(&self, payload: &PrintPayload) {
        let job = fetch_job_or_empty(&self.session).await;

        let message = self.composer.print_started(payload, &job);
        if let Err(e) = self.composer.send_new(&message).await {
            warn!(error = %e, "Failed to send print started message");
        }

        self.composer.invalidate(&LogicalKey::job_status());
        self.arm_poll();
    }

    async fn on_print_done(&self, payload: &PrintPayload) {
        let message = self.composer.print_done(payload);
        if let Err(e) = self.composer.send_new(&message).await {
            warn!(error = %e, "Failed to send print done message");
        }

        self.end_job();
    }

    // ========================================================================
    // Job State
    // ========================================================================

    /// Arms the job status poll, replacing any armed one.
    fn arm_poll(&self) {
        let session = Arc::clone(&self.session);
        let composer = Arc::clone(&self.composer);

        self.timer.arm(move || {
            let session = Arc::clone(&session);
            let composer = Arc::clone(&composer);
            async move { poll_job(&session, &composer).await }
        });
    }

    /// Disarms the poll and forgets the job status message.
    fn end_job(&self) {
        self.timer.disarm();
        self.composer.invalidate(&LogicalKey::job_status());
    }

    // ========================================================================
    // Socket
    // ========================================================================

    /// Encodes and queues a control frame.
    fn send_frame(&self, frame: &ControlFrame) -> Result<()> {
        let encoded = encode_control(frame)?;
        let link = self.link.lock();
        let link = link.as_ref().ok_or(Error::ConnectionClosed)?;

        link.send(ConnectionCommand::Send(encoded))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Asks the socket loop to close with `error`.
    fn fail(&self, error: Error) {
        if let Some(link) = self.link.lock().as_ref() {
            let _ = link.send(ConnectionCommand::Fail(error));
        }
    }
}

// ============================================================================
// Poll Action
// ============================================================================

/// Fetches the job status, falling back to an empty one.
async fn fetch_job_or_empty(session: &SessionManager) -> JobStatus {
    match session.fetch_job().await {
        Ok(job) => job,
        Err(e) => {
            warn!(error = %e, "Job status unavailable, using empty status");
            JobStatus::default()
        }
    }
}

/// One poll tick: stop on a terminal state, otherwise post the update.
async fn poll_job(session: &SessionManager, composer: &MessageComposer) -> TickOutcome {
    let job = match session.fetch_job().await {
        Ok(job) => job,
        Err(e) if e.is_auth_error() => {
            warn!(error = %e, "No session, stopping job poll");
            return TickOutcome::Stop;
        }
        Err(e) => {
            warn!(error = %e, "Job status unavailable, using empty status");
            JobStatus::default()
        }
    };

    if job.is_terminal() {
        debug!(state = %job.state, "Job no longer active, stopping poll");
        composer.invalidate(&LogicalKey::job_status());
        return TickOutcome::Stop;
    }

    let message = composer.job_update(&job);
    if let Err(e) = composer
        .send_or_edit(&LogicalKey::job_status(), &message)
        .await
    {
        warn!(error = %e, "Failed to post job update");
    }

    TickOutcome::Continue
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::Ordering;

    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    use crate::chat::ChatGateway;
    use crate::dispatch::timer::DEFAULT_POLL_INTERVAL;
    use crate::session::{Credentials, LoginRequest};
    use crate::testing::{FakeApi, FakeGateway};
    use crate::transport::ControllerApi;

    struct Harness {
        api: Arc<FakeApi>,
        gateway: Arc<FakeGateway>,
        dispatcher: Dispatcher,
        frames: mpsc::UnboundedReceiver<ConnectionCommand>,
    }

    async fn harness(api: FakeApi) -> Harness {
        let api = Arc::new(api);
        let gateway = Arc::new(FakeGateway::new(&["!room"]));

        let session = Arc::new(SessionManager::new(
            Arc::clone(&api) as Arc<dyn ControllerApi>,
            Credentials::user_password("alice", "pw"),
        ));
        session.login().await.unwrap();

        let composer = Arc::new(MessageComposer::new(
            Arc::clone(&gateway) as Arc<dyn ChatGateway>,
            None,
        ));

        let dispatcher = Dispatcher::new(session, composer, DEFAULT_POLL_INTERVAL, DEFAULT_THROTTLE);
        let (tx, frames) = mpsc::unbounded_channel();
        dispatcher.attach(tx);

        Harness {
            api,
            gateway,
            dispatcher,
            frames,
        }
    }

    fn printing(completion: u32) -> JobStatus {
        JobStatus::from_value(json!({
            "state": "Printing",
            "progress": { "completion": completion }
        }))
        .unwrap()
    }

    fn event(kind: &str, payload: Value) -> ControllerEvent {
        ControllerEvent::new(kind, payload)
    }

    fn print_event(event_type: &str) -> ControllerEvent {
        event(
            "event",
            json!({ "type": event_type, "payload": { "name": "cube.gcode", "time": 125.0 } }),
        )
    }

    fn next_frame(frames: &mut mpsc::UnboundedReceiver<ConnectionCommand>) -> String {
        match frames.try_recv() {
            Ok(ConnectionCommand::Send(frame)) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connected_sends_auth_then_throttle() {
        let mut h = harness(FakeApi::default()).await;
        assert_eq!(h.dispatcher.state(), ConnectionState::AwaitingAuthAck);

        h.dispatcher.dispatch(event("connected", json!({}))).await;

        assert_eq!(next_frame(&mut h.frames), r#"["{\"auth\":\"alice:token-1\"}"]"#);
        assert_eq!(next_frame(&mut h.frames), r#"["{\"throttle\":10}"]"#);
        assert_eq!(h.dispatcher.state(), ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_reauth_logout_is_passive_and_uses_new_session() {
        let mut h = harness(FakeApi::default()).await;
        h.dispatcher.dispatch(event("connected", json!({}))).await;
        next_frame(&mut h.frames);
        next_frame(&mut h.frames);

        h.dispatcher
            .dispatch(event("reauthRequired", json!({ "reason": "logout" })))
            .await;

        assert_eq!(h.api.logins()[1], LoginRequest::passive());
        assert_eq!(next_frame(&mut h.frames), r#"["{\"auth\":\"alice:token-2\"}"]"#);
        assert!(h.frames.try_recv().is_err());
        assert_eq!(h.dispatcher.state(), ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_reauth_other_reason_repeats_credentials() {
        let mut h = harness(FakeApi::default()).await;

        h.dispatcher
            .dispatch(event("reauthRequired", json!({ "reason": "stale" })))
            .await;

        assert_eq!(h.api.logins()[1], LoginRequest::credentials("alice", "pw"));
        assert_eq!(next_frame(&mut h.frames), r#"["{\"auth\":\"alice:token-2\"}"]"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reauth_closes_socket_and_goes_silent() {
        let mut h = harness(FakeApi::with_job(printing(10))).await;
        h.dispatcher.dispatch(print_event("PrintStarted")).await;
        assert!(h.dispatcher.is_polling());

        h.api.reject_logins.store(true, Ordering::SeqCst);
        h.dispatcher
            .dispatch(event("reauthRequired", json!({ "reason": "stale" })))
            .await;

        match h.frames.try_recv() {
            Ok(ConnectionCommand::Fail(e)) => assert!(e.is_auth_error()),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!h.dispatcher.is_polling());

        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 2).await;
        assert_eq!(h.gateway.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_lifecycle_end_to_end() {
        let h = harness(FakeApi::with_job(printing(0))).await;

        h.dispatcher.dispatch(print_event("PrintStarted")).await;
        assert_eq!(h.gateway.sent().len(), 1);
        assert!(h.gateway.sent()[0].plain_body.contains("cube.gcode"));
        assert!(h.dispatcher.is_polling());

        // Nothing before the interval elapses.
        tokio::time::sleep(DEFAULT_POLL_INTERVAL - Duration::from_secs(1)).await;
        assert_eq!(h.gateway.sent().len(), 1);

        // First tick sends the status message, the next one edits it.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.gateway.sent().len(), 2);
        h.api.set_job(Some(printing(50)));
        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert_eq!(h.gateway.sent().len(), 2);
        assert_eq!(h.gateway.edits().len(), 1);

        h.dispatcher.dispatch(print_event("PrintDone")).await;
        let sent = h.gateway.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[2].rich_body.is_none());
        assert!(!h.dispatcher.is_polling());

        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 3).await;
        assert_eq!(h.gateway.sent().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_state_stops_poll_without_sending() {
        let h = harness(FakeApi::with_job(printing(90))).await;
        h.dispatcher.dispatch(print_event("PrintStarted")).await;

        h.api.set_job(Some(
            JobStatus::from_value(json!({ "state": "Operational" })).unwrap(),
        ));
        tokio::time::sleep(DEFAULT_POLL_INTERVAL + Duration::from_secs(1)).await;

        assert_eq!(h.gateway.sent().len(), 1);
        assert!(!h.dispatcher.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_state_forgets_status_message() {
        let h = harness(FakeApi::with_job(printing(40))).await;
        h.dispatcher.dispatch(print_event("PrintStarted")).await;

        tokio::time::sleep(DEFAULT_POLL_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(h.gateway.sent().len(), 2);
        let correlation = h.dispatcher.composer.correlation();
        assert_eq!(correlation.entries(&LogicalKey::job_status()).await.len(), 1);

        h.api.set_job(Some(
            JobStatus::from_value(json!({ "state": "Operational" })).unwrap(),
        ));
        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;

        assert!(!h.dispatcher.is_polling());
        assert!(correlation.entries(&LogicalKey::job_status()).await.is_empty());
        assert_eq!(h.gateway.sent().len(), 2);
        assert!(h.gateway.edits().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_degrades_to_empty_status() {
        let h = harness(FakeApi::default()).await;

        h.dispatcher.dispatch(print_event("PrintStarted")).await;
        assert_eq!(h.gateway.sent().len(), 1);
        assert!(h.dispatcher.is_polling());

        // Unknown state is not terminal, so the poll keeps posting.
        tokio::time::sleep(DEFAULT_POLL_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(h.gateway.sent().len(), 2);
        assert!(h.dispatcher.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_duplicate_poll() {
        let h = harness(FakeApi::with_job(printing(5))).await;

        h.dispatcher.dispatch(print_event("PrintStarted")).await;
        h.dispatcher.dispatch(print_event("PrintStarted")).await;
        tokio::time::sleep(DEFAULT_POLL_INTERVAL + Duration::from_secs(1)).await;

        // Two start messages and a single status message.
        assert_eq!(h.gateway.sent().len(), 3);
        assert!(h.gateway.edits().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_and_cancelled_end_job_silently() {
        for event_type in ["PrintFailed", "PrintCancelled"] {
            let h = harness(FakeApi::with_job(printing(5))).await;
            h.dispatcher.dispatch(print_event("PrintStarted")).await;

            h.dispatcher.dispatch(print_event(event_type)).await;

            assert!(!h.dispatcher.is_polling(), "{event_type}");
            assert_eq!(h.gateway.sent().len(), 1, "{event_type}");
        }
    }

    #[tokio::test]
    async fn test_informational_and_unknown_events_are_ignored() {
        let mut h = harness(FakeApi::with_job(printing(5))).await;

        for event_type in ["PrintPaused", "PrintResumed", "PrintCancelling", "ZChange"] {
            h.dispatcher.dispatch(print_event(event_type)).await;
        }
        h.dispatcher.dispatch(event("current", json!({ "state": {} }))).await;
        h.dispatcher.dispatch(event("event", json!("garbage"))).await;

        assert!(h.gateway.sent().is_empty());
        assert!(!h.dispatcher.is_polling());
        assert!(h.frames.try_recv().is_err());
        assert_eq!(h.api.job_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_clears_job_state() {
        let h = harness(FakeApi::with_job(printing(5))).await;
        h.dispatcher.dispatch(print_event("PrintStarted")).await;

        h.dispatcher.detach();

        assert_eq!(h.dispatcher.state(), ConnectionState::Disconnected);
        assert!(!h.dispatcher.is_polling());
        assert!(matches!(
            h.dispatcher.send_frame(&ControlFrame::throttle(1)),
            Err(Error::ConnectionClosed)
        ));
    }
}
