//! Error types for the OctoPrint bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use octoprint_bridge::{Result, Error};
//!
//! async fn example(bridge: &Bridge) -> Result<()> {
//!     bridge.connect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Policy |
//! |----------|----------|--------|
//! | Authentication | [`Error::Auth`] | Propagated to the connect/reconnect orchestrator |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::HttpStatus`], [`Error::Http`], [`Error::WebSocket`] | Retried at the connection lifecycle level |
//! | Decode | [`Error::Decode`] | Logged, frame dropped |
//! | Upstream data | [`Error::UpstreamData`] | Logged, handler proceeds with empty status |
//! | Chat | [`Error::Chat`] | Logged by the handler that sent |
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] | Returned from `build()` |
//! | External | [`Error::Json`] | Context dependent |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Controller base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// Login or reauthentication rejected by the controller.
    ///
    /// Fatal to the current connection attempt.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Websocket closed, or the bridge is not connected.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Controller answered with a non-success HTTP status.
    #[error("HTTP {status} from {path}")]
    HttpStatus {
        /// Status code returned.
        status: u16,
        /// API path that was requested.
        path: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Malformed inbound frame or payload.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of what failed to decode.
        message: String,
    },

    /// REST data needed to compose a message could not be fetched.
    #[error("Upstream data unavailable: {message}")]
    UpstreamData {
        /// Description of the fetch failure.
        message: String,
    },

    // ========================================================================
    // Chat Errors
    // ========================================================================
    /// Chat gateway rejected a send or edit.
    #[error("Chat gateway error: {message}")]
    Chat {
        /// Description of the gateway failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[inline]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    #[inline]
    pub fn http_status(status: u16, path: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            path: path.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an upstream data error.
    #[inline]
    pub fn upstream_data(message: impl Into<String>) -> Self {
        Self::UpstreamData {
            message: message.into(),
        }
    }

    /// Creates a chat gateway error.
    #[inline]
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is an authentication error.
    #[inline]
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Returns `true` if this is a transport error.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::HttpStatus { .. }
                | Self::Http(_)
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Transport failures are retried by reconnecting; everything else
    /// needs operator attention.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_transport_error()
    }
}

// ============================================================================
// Tests
// ============================================================================
