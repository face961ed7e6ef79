//! Message composition and the create-vs-edit policy.
//!
//! # Policy
//!
//! | Notification | Behaviour |
//! |--------------|-----------|
//! | print started | always a new message |
//! | print done | always a new message |
//! | job status update | edit the correlated message, or send and correlate |
//!
//! Standalone notifications never touch the correlation table.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::{ChatGateway, Delivery, OutboundMessage};
use crate::error::Result;
use crate::identifiers::{LogicalKey, RoomId};
use crate::protocol::{JobStatus, PrintPayload};

use super::correlation::CorrelationTable;
use super::templates::{self, Rendered};

// ============================================================================
// PostOutcome
// ============================================================================

/// What [`MessageComposer::send_or_edit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// A new message was sent and correlated.
    Sent(Vec<Delivery>),
    /// Existing messages were edited in this many rooms.
    Edited(usize),
}

// ============================================================================
// MessageComposer
// ============================================================================

/// Renders controller data into chat messages and posts them.
pub struct MessageComposer {
    /// Chat transport.
    gateway: Arc<dyn ChatGateway>,
    /// Correlation state shared by the receive loop and the poll timer.
    correlation: CorrelationTable,
    /// Room all messages go to; `None` broadcasts.
    room: Option<RoomId>,
}

impl std::fmt::Debug for MessageComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageComposer")
            .field("room", &self.room)
            .finish_non_exhaustive()
    }
}

impl MessageComposer {
    /// Creates a composer posting to `room` (or broadcasting).
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, room: Option<RoomId>) -> Self {
        Self {
            gateway,
            correlation: CorrelationTable::new(),
            room,
        }
    }

    /// Returns the correlation table.
    #[inline]
    #[must_use]
    pub fn correlation(&self) -> &CorrelationTable {
        &self.correlation
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Builds the "print started" message.
    #[must_use]
    pub fn print_started(&self, event: &PrintPayload, job: &JobStatus) -> OutboundMessage {
        self.build(templates::print_started(event, job), Some(job.snapshot()))
    }

    /// Builds a job status update.
    #[must_use]
    pub fn job_update(&self, job: &JobStatus) -> OutboundMessage {
        self.build(templates::print_update(job), Some(job.snapshot()))
    }

    /// Builds the "print done" message.
    #[must_use]
    pub fn print_done(&self, event: &PrintPayload) -> OutboundMessage {
        self.build(templates::print_done(event), None)
    }

    fn build(&self, rendered: Rendered, data: Option<serde_json::Value>) -> OutboundMessage {
        let mut message = OutboundMessage::new(rendered.plain).for_room(self.room.clone());
        if let Some(rich) = rendered.rich {
            message = message.with_rich_body(rich);
        }
        if let Some(data) = data.filter(|d| !d.is_null()) {
            message = message.with_data(data);
        }
        message
    }

    // ========================================================================
    // Posting
    // ========================================================================

    /// Sends a standalone message.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn send_new(&self, message: &OutboundMessage) -> Result<Vec<Delivery>> {
        let deliveries = self.gateway.send(message).await?;
        debug!(rooms = deliveries.len(), "Sent standalone message");
        Ok(deliveries)
    }

    /// Edits the message correlated with `key`, or sends a new one and
    /// correlates it.
    ///
    /// The whole lookup, post and store runs under the key's lock. A failed
    /// edit forgets that room's entry so the next update sends afresh.
    ///
    /// # Errors
    ///
    /// Returns the first gateway error.
    pub async fn send_or_edit(
        &self,
        key: &LogicalKey,
        message: &OutboundMessage,
    ) -> Result<PostOutcome> {
        let mut guard = self.correlation.lock(key).await;

        let targets: Vec<_> = match &message.target_room {
            Some(room) => guard.find(room).cloned().into_iter().collect(),
            None => guard.entries().to_vec(),
        };

        if targets.is_empty() {
            let deliveries = self.gateway.send(message).await?;
            for delivery in &deliveries {
                guard.record(delivery);
            }
            debug!(key = %key, rooms = deliveries.len(), "Sent correlated message");
            return Ok(PostOutcome::Sent(deliveries));
        }

        for entry in &targets {
            if let Err(e) = self
                .gateway
                .edit(&entry.message_id, &entry.room, message)
                .await
            {
                warn!(key = %key, room = %entry.room, error = %e, "Edit failed, forgetting message");
                guard.forget(&entry.room);
                return Err(e);
            }
        }

        debug!(key = %key, rooms = targets.len(), "Edited correlated message");
        Ok(PostOutcome::Edited(targets.len()))
    }

    /// Forgets the message correlated with `key`.
    pub fn invalidate(&self, key: &LogicalKey) {
        self.correlation.invalidate(key);
    }

    /// Forgets every correlated message.
    pub fn invalidate_all(&self) {
        self.correlation.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::error::Error;
    use crate::testing::FakeGateway;

    fn composer(gateway: &Arc<FakeGateway>, room: Option<&str>) -> MessageComposer {
        MessageComposer::new(
            Arc::clone(gateway) as Arc<dyn ChatGateway>,
            room.map(RoomId::new),
        )
    }

    fn printing() -> JobStatus {
        JobStatus::from_value(json!({ "state": "Printing", "progress": { "completion": 10 } }))
            .unwrap()
    }

    #[test]
    fn test_print_done_has_no_rich_body_or_data() {
        let gateway = Arc::new(FakeGateway::new(&["!a"]));
        let message = composer(&gateway, None).print_done(&PrintPayload::default());
        assert!(message.rich_body.is_none());
        assert!(message.data.is_none());
    }

    #[test]
    fn test_job_update_carries_snapshot() {
        let gateway = Arc::new(FakeGateway::new(&["!a"]));
        let message = composer(&gateway, Some("!a")).job_update(&printing());

        assert!(message.rich_body.is_some());
        assert_eq!(message.target_room, Some(RoomId::new("!a")));
        assert_eq!(message.data.unwrap()["state"], json!("Printing"));
    }

    #[tokio::test]
    async fn test_repeated_updates_send_once_then_edit() {
        let gateway = Arc::new(FakeGateway::new(&["!a", "!b"]));
        let composer = composer(&gateway, None);
        let key = LogicalKey::job_status();
        let message = composer.job_update(&printing());

        let first = composer.send_or_edit(&key, &message).await.unwrap();
        let second = composer.send_or_edit(&key, &message).await.unwrap();
        let third = composer.send_or_edit(&key, &message).await.unwrap();

        assert!(matches!(first, PostOutcome::Sent(ref d) if d.len() == 2));
        assert_eq!(second, PostOutcome::Edited(2));
        assert_eq!(third, PostOutcome::Edited(2));
        assert_eq!(gateway.sent().len(), 1);
        assert_eq!(gateway.edits().len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_updates_send_once() {
        let gateway = Arc::new(FakeGateway::new(&["!a"]).with_latency());
        let composer = Arc::new(composer(&gateway, Some("!a")));
        let key = LogicalKey::job_status();
        let message = composer.job_update(&printing());

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let composer = Arc::clone(&composer);
                let key = key.clone();
                let message = message.clone();
                tokio::spawn(async move { composer.send_or_edit(&key, &message).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(gateway.sent().len(), 1);
        assert_eq!(gateway.edits().len(), 3);
    }

    #[tokio::test]
    async fn test_standalone_messages_do_not_correlate() {
        let gateway = Arc::new(FakeGateway::new(&["!a"]));
        let composer = composer(&gateway, None);

        let started = composer.print_started(&PrintPayload::default(), &printing());
        composer.send_new(&started).await.unwrap();
        composer.send_new(&started).await.unwrap();

        assert_eq!(gateway.sent().len(), 2);
        assert!(
            composer
                .correlation()
                .entries(&LogicalKey::job_status())
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_invalidate_starts_new_message() {
        let gateway = Arc::new(FakeGateway::new(&["!a"]));
        let composer = composer(&gateway, None);
        let key = LogicalKey::job_status();
        let message = composer.job_update(&printing());

        composer.send_or_edit(&key, &message).await.unwrap();
        composer.invalidate(&key);
        let outcome = composer.send_or_edit(&key, &message).await.unwrap();

        assert!(matches!(outcome, PostOutcome::Sent(_)));
        assert_eq!(gateway.sent().len(), 2);
        assert!(gateway.edits().is_empty());
    }

    #[tokio::test]
    async fn test_failed_edit_forgets_entry() {
        let gateway = Arc::new(FakeGateway::new(&["!a"]));
        let composer = composer(&gateway, Some("!a"));
        let key = LogicalKey::job_status();
        let message = composer.job_update(&printing());

        composer.send_or_edit(&key, &message).await.unwrap();
        gateway.fail_edits(true);
        let err = composer.send_or_edit(&key, &message).await.unwrap_err();
        assert!(matches!(err, Error::Chat { .. }));

        gateway.fail_edits(false);
        let outcome = composer.send_or_edit(&key, &message).await.unwrap();
        assert!(matches!(outcome, PostOutcome::Sent(_)));
    }
}
