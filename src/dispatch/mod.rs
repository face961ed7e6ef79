//! Event dispatch and job polling.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Dispatcher`] | Routes controller events to handlers |
//! | [`ConnectionState`] | Connection lifecycle |
//! | [`PollTimer`] | Repeating, cancellable job status poll |

// ============================================================================
// Submodules
// ============================================================================

/// Event dispatcher.
pub mod dispatcher;

/// Poll timer.
pub mod timer;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::{ConnectionState, DEFAULT_THROTTLE, Dispatcher};
pub use timer::{DEFAULT_POLL_INTERVAL, PollTimer, TickOutcome};
