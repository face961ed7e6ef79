//! OctoPrint bridge - controller events as chat messages.
//!
//! This library keeps a live session against an OctoPrint controller's REST
//! API and push socket, turns print events into chat notifications, and
//! edits a single status message in place while a job runs.
//!
//! # Architecture
//!
//! ```text
//! controller ─► websocket ─► Envelope Codec ─► Dispatcher ─► Composer ─► ChatGateway
//!                                                  │
//!                                  SessionManager ◄┘ (REST login, job status)
//! ```
//!
//! Key design points:
//!
//! - One [`Bridge`] owns the session, the socket and the dispatch context
//! - The chat side is a capability: implement [`ChatGateway`] for any
//!   transport that can send and edit messages
//! - Job status updates are correlated by logical key, so repeated updates
//!   edit one message instead of flooding the room
//! - A reauthentication in flight suspends every token reader
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use octoprint_bridge::{Bridge, ChatGateway, Result};
//!
//! async fn bridge(gateway: Arc<dyn ChatGateway>) -> Result<()> {
//!     let bridge = Bridge::builder()
//!         .base_url("http://octopi.local")
//!         .api_key("0123456789ABCDEF")
//!         .gateway(gateway)
//!         .build()?;
//!
//!     // Reconnects on transport failures, stops on auth failures.
//!     bridge.run().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`] lifecycle and [`BridgeBuilder`] |
//! | [`chat`] | [`ChatGateway`] capability and [`OutboundMessage`] |
//! | [`compose`] | Templates, unit formatting, create-vs-edit policy |
//! | [`dispatch`] | Event routing and the job poll timer |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Socket framing and controller message types |
//! | [`session`] | Login, reauthentication, logout |
//! | [`transport`] | REST client and socket event loop |

// ============================================================================
// Modules
// ============================================================================

/// Bridge entry point.
///
/// Use [`Bridge::builder()`] to create a configured bridge.
pub mod bridge;

/// Chat gateway capability and outbound messages.
pub mod chat;

/// Message composition and correlation.
pub mod compose;

/// Event dispatch and job polling.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for chat entities and correlation keys.
pub mod identifiers;

/// Controller socket protocol.
pub mod protocol;

/// Controller session management.
pub mod session;

/// REST and websocket transports.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bridge, BridgeBuilder};

// Chat types
pub use chat::{ChatGateway, Delivery, MessageType, OutboundMessage};

// Composition types
pub use compose::{CorrelationEntry, MessageComposer, PostOutcome};

// Dispatch types
pub use dispatch::{ConnectionState, Dispatcher, PollTimer};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{LogicalKey, MessageId, RoomId};

// Protocol types
pub use protocol::{ControllerEvent, JobStatus, PrintEvent, PrintPayload};

// Session types
pub use session::{Credentials, Session, SessionManager};

// Transport types
pub use transport::{ControllerApi, HttpApi};
