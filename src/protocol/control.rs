//! Outbound control frames.
//!
//! # Format
//!
//! | Frame | JSON |
//! |-------|------|
//! | [`ControlFrame::Auth`] | `{"auth": "<name>:<session>"}` |
//! | [`ControlFrame::Throttle`] | `{"throttle": 10}` |
//!
//! Frames are wrapped by [`encode_control`](super::envelope::encode_control)
//! before they go on the wire.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::session::Session;

// ============================================================================
// ControlFrame
// ============================================================================

/// A control message sent from the bridge to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlFrame {
    /// Binds the socket to a login session.
    Auth(String),

    /// Asks the server to send one batch every `n * 500ms`.
    Throttle(u32),
}

impl ControlFrame {
    /// Creates the auth frame for a session.
    #[inline]
    #[must_use]
    pub fn auth(session: &Session) -> Self {
        Self::Auth(format!("{}:{}", session.name, session.token))
    }

    /// Creates a throttle frame.
    #[inline]
    #[must_use]
    pub fn throttle(factor: u32) -> Self {
        Self::Throttle(factor)
    }
}

// ============================================================================
// Tests
// ============================================================================
