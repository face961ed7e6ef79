//! Chat message composition.
//!
//! Turns controller events and polled job status into [`OutboundMessage`]s
//! and decides whether an update edits an earlier message or starts a new
//! one.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `composer` | [`MessageComposer`] and the create-vs-edit policy |
//! | `correlation` | Logical key to sent message table |
//! | `format` | Duration, length and size projections |
//! | `templates` | Plain and rich bodies per notification |
//!
//! [`OutboundMessage`]: crate::chat::OutboundMessage

// ============================================================================
// Submodules
// ============================================================================

/// Message composer.
pub mod composer;

/// Correlation table.
pub mod correlation;

/// Unit formatting helpers.
pub mod format;

/// Notification templates.
pub mod templates;

// ============================================================================
// Re-exports
// ============================================================================

pub use composer::{MessageComposer, PostOutcome};
pub use correlation::{CorrelationEntry, CorrelationGuard, CorrelationTable};
pub use templates::Rendered;
