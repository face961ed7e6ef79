//! Controller socket protocol.
//!
//! This module defines the wire framing and message types exchanged with
//! the controller over its push socket, plus the job snapshot fetched over
//! REST.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Envelope` | Controller → Bridge | Batched frame of events |
//! | `ControllerEvent` | Controller → Bridge | One `kind` + payload |
//! | `ControlFrame` | Bridge → Controller | Auth and throttle directives |
//! | `JobStatus` | REST `GET /api/job` | Current job snapshot |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `control` | Outbound control frames |
//! | `envelope` | Frame codec |
//! | `job` | Job status snapshot |
//! | `message` | Controller events and typed views |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound control frames.
pub mod control;

/// Inbound frame decoding and outbound frame encoding.
pub mod envelope;

/// Job status snapshot.
pub mod job;

/// Controller message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use control::ControlFrame;
pub use envelope::{Envelope, FrameKind, decode_events, encode_control};
pub use job::{FileInfo, Filament, JobInfo, JobStatus, Progress};
pub use message::{ControllerEvent, ParsedMessage, PrintEvent, PrintPayload};
