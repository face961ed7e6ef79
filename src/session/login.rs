//! Login request and session types.
//!
//! # Format
//!
//! `POST /api/login` request bodies:
//!
//! ```json
//! { "passive": true }
//! { "user": "alice", "pass": "hunter2" }
//! ```
//!
//! The response carries the user `name` and the `session` token used in the
//! socket auth frame.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// LoginRequest
// ============================================================================

/// Body of a `POST /api/login` request.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LoginRequest {
    /// Re-establish the session from the API key or existing cookie.
    Passive {
        /// Always `true`.
        passive: bool,
    },

    /// Exchange a user name and password for a session.
    Credentials {
        /// User name.
        user: String,
        /// Password.
        pass: String,
    },
}

impl LoginRequest {
    /// Creates a passive login request.
    #[inline]
    #[must_use]
    pub fn passive() -> Self {
        Self::Passive { passive: true }
    }

    /// Creates a user/password login request.
    #[inline]
    #[must_use]
    pub fn credentials(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self::Credentials {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Returns `true` for a passive login.
    #[inline]
    #[must_use]
    pub fn is_passive(&self) -> bool {
        matches!(self, Self::Passive { .. })
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passive { .. } => f.write_str("Passive"),
            Self::Credentials { user, .. } => f
                .debug_struct("Credentials")
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// An authenticated controller session.
///
/// Replaced wholesale on reauthentication; never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// User name the session belongs to.
    pub name: String,

    /// Session token.
    pub token: String,

    /// When the session was established.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            created_at: Utc::now(),
        }
    }

    /// Builds a session from a `/api/login` response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if `name` or `session` is missing.
    pub fn from_login_body(body: &Value) -> Result<Self> {
        let field = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::auth(format!("login response has no `{key}`")))
        };

        Ok(Self::new(field("name")?, field("session")?))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
