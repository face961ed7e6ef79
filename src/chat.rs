//! Chat gateway capability and outbound message values.
//!
//! The bridge does not speak the chat protocol itself. It depends on a
//! [`ChatGateway`] that can send a message and edit one it sent earlier.
//!
//! # Room Targeting
//!
//! An [`OutboundMessage`] without a target room is broadcast to every room
//! the gateway has joined. With a target, the gateway matches it against
//! room identity or id. Either way `send` reports one [`Delivery`] per room
//! that received the message.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::identifiers::{MessageId, RoomId};

// ============================================================================
// Constants
// ============================================================================

/// Content `format` value for HTML rich bodies.
pub const RICH_FORMAT: &str = "org.matrix.custom.html";

/// Content key carrying the structured data snapshot.
pub const DATA_KEY: &str = "org.octoprint.data";

// ============================================================================
// MessageType
// ============================================================================

/// Chat message type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Automated notice (default for bridge output).
    #[default]
    Notice,
    /// Plain text message.
    Text,
}

impl MessageType {
    /// Returns the wire name of the message type.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notice => "m.notice",
            Self::Text => "m.text",
        }
    }
}

// ============================================================================
// OutboundMessage
// ============================================================================

/// A message ready to be sent or used as an edit.
///
/// Pure value, built fresh for every send or edit.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Plain text body.
    pub plain_body: String,
    /// HTML body, if any.
    pub rich_body: Option<String>,
    /// Message type.
    pub message_type: MessageType,
    /// Target room; `None` broadcasts.
    pub target_room: Option<RoomId>,
    /// Structured snapshot for machine consumers.
    pub data: Option<Value>,
}

impl OutboundMessage {
    /// Creates a plain notice.
    #[must_use]
    pub fn new(plain_body: impl Into<String>) -> Self {
        Self {
            plain_body: plain_body.into(),
            rich_body: None,
            message_type: MessageType::default(),
            target_room: None,
            data: None,
        }
    }

    /// Sets the HTML body.
    #[inline]
    #[must_use]
    pub fn with_rich_body(mut self, rich_body: impl Into<String>) -> Self {
        self.rich_body = Some(rich_body.into());
        self
    }

    /// Sets the message type.
    #[inline]
    #[must_use]
    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Targets a single room.
    #[inline]
    #[must_use]
    pub fn for_room(mut self, room: Option<RoomId>) -> Self {
        self.target_room = room;
        self
    }

    /// Attaches a structured snapshot.
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the room message content for this message.
    ///
    /// ```json
    /// {
    ///   "body": "...",
    ///   "format": "org.matrix.custom.html",
    ///   "formatted_body": "...",
    ///   "msgtype": "m.notice",
    ///   "org.octoprint.data": { ... }
    /// }
    /// ```
    ///
    /// `format`, `formatted_body` and the data key are omitted when unset.
    #[must_use]
    pub fn to_content(&self) -> Value {
        let mut content = Map::new();
        content.insert("body".into(), Value::String(self.plain_body.clone()));

        if let Some(rich) = &self.rich_body {
            content.insert("format".into(), Value::String(RICH_FORMAT.into()));
            content.insert("formatted_body".into(), Value::String(rich.clone()));
        }

        content.insert(
            "msgtype".into(),
            Value::String(self.message_type.as_str().into()),
        );

        if let Some(data) = &self.data {
            content.insert(DATA_KEY.into(), data.clone());
        }

        Value::Object(content)
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// One room's copy of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delivery {
    /// Room the message landed in.
    pub room: RoomId,
    /// Id of the message in that room.
    pub message_id: MessageId,
}

impl Delivery {
    /// Creates a delivery record.
    #[inline]
    #[must_use]
    pub fn new(room: impl Into<RoomId>, message_id: impl Into<MessageId>) -> Self {
        Self {
            room: room.into(),
            message_id: message_id.into(),
        }
    }
}

// ============================================================================
// ChatGateway
// ============================================================================

/// Send and edit primitives of the chat transport.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Sends a message, returning one delivery per receiving room.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Chat`](crate::Error::Chat) if the transport rejects
    /// the message.
    async fn send(&self, message: &OutboundMessage) -> Result<Vec<Delivery>>;

    /// Replaces the content of a previously sent message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Chat`](crate::Error::Chat) if the transport rejects
    /// the edit.
    async fn edit(
        &self,
        message_id: &MessageId,
        room: &RoomId,
        message: &OutboundMessage,
    ) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_plain_content() {
        let content = OutboundMessage::new("Print done").to_content();
        assert_eq!(content, json!({ "body": "Print done", "msgtype": "m.notice" }));
    }

    #[test]
    fn test_rich_content_with_data() {
        let content = OutboundMessage::new("plain")
            .with_rich_body("<b>rich</b>")
            .with_type(MessageType::Text)
            .with_data(json!({ "state": "Printing" }))
            .to_content();

        assert_eq!(
            content,
            json!({
                "body": "plain",
                "format": "org.matrix.custom.html",
                "formatted_body": "<b>rich</b>",
                "msgtype": "m.text",
                "org.octoprint.data": { "state": "Printing" }
            })
        );
    }

    #[test]
    fn test_for_room() {
        let message = OutboundMessage::new("x").for_room(Some(RoomId::new("!a:b")));
        assert_eq!(message.target_room, Some(RoomId::new("!a:b")));
    }
}
