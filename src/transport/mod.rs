//! Controller transports.
//!
//! The bridge talks to the controller over two channels:
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge (Rust)  │   REST  /api/login, /api/job │  Controller     │
//! │                 │─────────────────────────────►│                 │
//! │  HttpApi        │                              │  HTTP server    │
//! │  Connection     │◄────────────────────────────►│  Push socket    │
//! │                 │   /sockjs/NNN/<id>/websocket │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `HttpApi::login` - Establish a session over REST
//! 2. `websocket_url` - Derive a fresh socket URL from the REST base
//! 3. `Connection::open` - Connect and spawn the event loop
//! 4. Consume decoded events, queue control frames with `ConnectionCommand`
//! 5. `Connection::shutdown` - Close the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | REST capability and `reqwest` client |
//! | `websocket` | Push socket and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// Controller REST API.
pub mod http;

/// Controller push socket.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::{ControllerApi, HttpApi};
pub use websocket::{
    CommandSender, Connection, ConnectionCommand, EventReceiver, websocket_url,
};
