//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Controller settings from the environment

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Controller used when `OCTOPRINT_URL` is unset.
pub const DEFAULT_URL: &str = "http://octopi.local";

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub once: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            once: args.iter().any(|a| a == "--once"),
        }
    }
}

/// Controller connection settings.
#[derive(Debug, Clone)]
pub struct Controller {
    pub url: String,
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Controller {
    /// Reads `OCTOPRINT_URL`, `OCTOPRINT_API_KEY`, `OCTOPRINT_USER` and
    /// `OCTOPRINT_PASSWORD`.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("OCTOPRINT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            api_key: std::env::var("OCTOPRINT_API_KEY").ok(),
            user: std::env::var("OCTOPRINT_USER").ok(),
            password: std::env::var("OCTOPRINT_PASSWORD").ok(),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "octoprint_bridge=debug"
    } else {
        "octoprint_bridge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
