//! Envelope codec for the controller's batched socket framing.
//!
//! # Inbound
//!
//! Each frame starts with a one character tag:
//!
//! | Tag | Body | Events |
//! |-----|------|--------|
//! | `a` | JSON array of objects | one per key of each object, in array order |
//! | `m` | JSON object | one per key |
//! | other | | decode error |
//!
//! A decode error drops the frame; it never closes the connection.
//!
//! # Outbound
//!
//! A control frame is JSON encoded, placed in a one element array and
//! encoded again:
//!
//! ```text
//! {"throttle":10}  →  ["{\"throttle\":10}"]
//! ```
//!
//! The server rejects frames that are not double encoded.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, from_str, to_string};
use tracing::{trace, warn};

use crate::error::{Error, Result};

use super::control::ControlFrame;
use super::message::ControllerEvent;

// ============================================================================
// FrameKind
// ============================================================================

/// Tag of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// `a`: array of event objects.
    Array,
    /// `m`: single event object.
    Message,
}

impl FrameKind {
    /// Maps a tag character to a frame kind.
    #[inline]
    #[must_use]
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'a' => Some(Self::Array),
            'm' => Some(Self::Message),
            _ => None,
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Frame tag.
    pub kind: FrameKind,

    /// Raw payloads in wire order. Each is a JSON object.
    pub payloads: Vec<Value>,
}

impl Envelope {
    /// Decodes one inbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the tag is unknown, the body is not
    /// valid JSON, or the body does not have the shape the tag promises.
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let tag = chars
            .next()
            .ok_or_else(|| Error::decode("empty frame"))?;
        let kind = FrameKind::from_tag(tag)
            .ok_or_else(|| Error::decode(format!("unknown frame tag {tag:?}")))?;
        let body: Value = from_str(chars.as_str())
            .map_err(|e| Error::decode(format!("invalid JSON body: {e}")))?;

        let payloads = match (kind, body) {
            (FrameKind::Array, Value::Array(items)) => {
                if let Some(bad) = items.iter().position(|item| !item.is_object()) {
                    return Err(Error::decode(format!(
                        "array element {bad} is not an object"
                    )));
                }
                items
            }
            (FrameKind::Message, body @ Value::Object(_)) => vec![body],
            (kind, _) => {
                return Err(Error::decode(format!("body does not match {kind:?} frame")));
            }
        };

        Ok(Self { kind, payloads })
    }

    /// Splits the payloads into events, preserving wire order.
    #[must_use]
    pub fn into_events(self) -> Vec<ControllerEvent> {
        self.payloads
            .into_iter()
            .filter_map(|payload| match payload {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .flat_map(|map| {
                map.into_iter()
                    .map(|(kind, payload)| ControllerEvent::new(kind, payload))
            })
            .collect()
    }
}

// ============================================================================
// Codec Functions
// ============================================================================

/// Decodes a frame into events, logging and dropping malformed frames.
///
/// Never fails: a bad frame yields no events.
#[must_use]
pub fn decode_events(frame: &str) -> Vec<ControllerEvent> {
    match Envelope::decode(frame) {
        Ok(envelope) => envelope.into_events(),
        Err(e) => {
            // Open and heartbeat frames carry no events.
            if matches!(frame, "o" | "h") {
                trace!(frame, "Ignoring transport frame");
            } else {
                warn!(error = %e, "Dropping malformed frame");
            }
            Vec::new()
        }
    }
}

/// Encodes an outbound control frame with the double JSON wrapping.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_control(frame: &ControlFrame) -> Result<String> {
    let inner = to_string(frame)?;
    Ok(to_string(&[inner])?)
}

// ============================================================================
// Tests
// ============================================================================
