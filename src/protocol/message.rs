//! Controller message types.
//!
//! Every decoded frame yields one or more [`ControllerEvent`]s. Each event is
//! a `kind` (the key of the object on the wire) plus its payload.
//!
//! # Message Kinds
//!
//! | Kind | Payload | Parsed as |
//! |------|---------|-----------|
//! | `connected` | server version info | [`ParsedMessage::Connected`] |
//! | `reauthRequired` | `{ "reason": ... }` | [`ParsedMessage::ReauthRequired`] |
//! | `event` | `{ "type": ..., "payload": { ... } }` | [`ParsedMessage::Event`] |
//! | anything else | | [`ParsedMessage::Unknown`] |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// ControllerEvent
// ============================================================================

/// One decoded controller message.
///
/// # Format
///
/// ```json
/// { "event": { "type": "PrintStarted", "payload": { "name": "cube.gcode" } } }
/// ```
///
/// decodes to `kind = "event"` and `payload = { "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerEvent {
    /// Message kind (`connected`, `event`, ...).
    pub kind: String,

    /// Message payload.
    pub payload: Value,
}

impl ControllerEvent {
    /// Creates a new event.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedMessage {
        match self.kind.as_str() {
            "connected" => ParsedMessage::Connected,

            "reauthRequired" => ParsedMessage::ReauthRequired {
                reason: self
                    .payload
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },

            "event" => {
                let event_type = self
                    .payload
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let payload = self.payload.get("payload").cloned().unwrap_or(Value::Null);
                ParsedMessage::Event(PrintEvent::from_parts(event_type, payload))
            }

            _ => ParsedMessage::Unknown {
                kind: self.kind.clone(),
            },
        }
    }
}

// ============================================================================
// ParsedMessage
// ============================================================================

/// Typed view of a [`ControllerEvent`], selected by message kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// Socket is open and the server expects an auth frame.
    Connected,

    /// Server invalidated the session.
    ReauthRequired {
        /// Why the session was invalidated (`logout`, `removed`, `stale`, ...).
        reason: String,
    },

    /// Printer event.
    Event(PrintEvent),

    /// Message kind this bridge does not handle (`current`, `history`, `plugin`, ...).
    Unknown {
        /// The unhandled kind.
        kind: String,
    },
}

// ============================================================================
// PrintEvent
// ============================================================================

/// Print lifecycle events, selected by the nested `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintEvent {
    /// A print job started.
    Started(PrintPayload),
    /// A print job finished successfully.
    Done(PrintPayload),
    /// A print job failed.
    Failed(PrintPayload),
    /// A cancel was requested.
    Cancelling(PrintPayload),
    /// A print job was cancelled.
    Cancelled(PrintPayload),
    /// A print job was paused.
    Paused(PrintPayload),
    /// A paused print job was resumed.
    Resumed(PrintPayload),
    /// Any other event type.
    Other {
        /// The event `type` string.
        event_type: String,
    },
}

impl PrintEvent {
    /// Builds a typed event from the `type` tag and its raw payload.
    ///
    /// A payload that does not match [`PrintPayload`] degrades to an empty one.
    #[must_use]
    pub fn from_parts(event_type: &str, payload: Value) -> Self {
        let parse = || PrintPayload::from_value(payload);

        match event_type {
            "PrintStarted" => Self::Started(parse()),
            "PrintDone" => Self::Done(parse()),
            "PrintFailed" => Self::Failed(parse()),
            "PrintCancelling" => Self::Cancelling(parse()),
            "PrintCancelled" => Self::Cancelled(parse()),
            "PrintPaused" => Self::Paused(parse()),
            "PrintResumed" => Self::Resumed(parse()),
            other => Self::Other {
                event_type: other.to_string(),
            },
        }
    }

    /// Returns the controller's name for this event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::Started(_) => "PrintStarted",
            Self::Done(_) => "PrintDone",
            Self::Failed(_) => "PrintFailed",
            Self::Cancelling(_) => "PrintCancelling",
            Self::Cancelled(_) => "PrintCancelled",
            Self::Paused(_) => "PrintPaused",
            Self::Resumed(_) => "PrintResumed",
            Self::Other { event_type } => event_type,
        }
    }

    /// Returns `true` if this event ends the active job.
    #[inline]
    #[must_use]
    pub fn ends_job(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_) | Self::Cancelled(_))
    }
}

// ============================================================================
// PrintPayload
// ============================================================================

/// Known fields of a print lifecycle event payload.
///
/// Unknown fields are kept in `extra` for the structured message snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintPayload {
    /// File name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Path of the file within its storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Storage origin (`local` or `sdcard`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// User that started the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Elapsed print time in seconds (set on done/failed/cancelled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,

    /// Failure reason (`error` or `cancelled`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrintPayload {
    /// Parses a payload, falling back to an empty one on mismatch.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
