//! Bridge entry point.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | Connection lifecycle and shared context |
//! | [`BridgeBuilder`] | Fluent configuration builder |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use octoprint_bridge::{Bridge, ChatGateway};
//!
//! # async fn example(gateway: Arc<dyn ChatGateway>) -> octoprint_bridge::Result<()> {
//! let bridge = Bridge::builder()
//!     .base_url("http://octopi.local")
//!     .credentials("alice", "secret")
//!     .poll_interval(Duration::from_secs(600))
//!     .room("!printer:example.org")
//!     .gateway(gateway)
//!     .build()?;
//!
//! bridge.connect().await?;
//! let reason = bridge.closed().await;
//! bridge.disconnect().await;
//! # reason
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for bridge configuration.
pub mod builder;

/// Core bridge implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{BridgeBuilder, DEFAULT_RECONNECT_DELAY};
pub use core::Bridge;
