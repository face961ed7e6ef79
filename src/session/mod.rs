//! Controller session management.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Credentials`] | Configured API key and/or user/password |
//! | [`LoginRequest`] | Body of `POST /api/login` |
//! | [`Session`] | Authenticated session (`name`, `token`, `created_at`) |
//! | [`SessionManager`] | Login, reauthentication, logout |

// ============================================================================
// Submodules
// ============================================================================

/// Configured controller identity.
pub mod credentials;

/// Login request and session types.
pub mod login;

/// Session lifecycle.
pub mod manager;

// ============================================================================
// Re-exports
// ============================================================================

pub use credentials::Credentials;
pub use login::{LoginRequest, Session};
pub use manager::SessionManager;
