//! Builder pattern for bridge configuration.
//!
//! Provides a fluent API for configuring and creating [`Bridge`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use octoprint_bridge::{Bridge, ChatGateway};
//!
//! # async fn example(gateway: Arc<dyn ChatGateway>) -> octoprint_bridge::Result<()> {
//! let bridge = Bridge::builder()
//!     .base_url("http://octopi.local")
//!     .api_key("0123456789ABCDEF")
//!     .gateway(gateway)
//!     .build()?;
//!
//! bridge.run().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::chat::ChatGateway;
use crate::dispatch::{DEFAULT_POLL_INTERVAL, DEFAULT_THROTTLE};
use crate::error::{Error, Result};
use crate::identifiers::RoomId;
use crate::session::Credentials;
use crate::transport::{ControllerApi, HttpApi};

use super::core::{Bridge, BridgeConfig};

// ============================================================================
// Constants
// ============================================================================

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`] instance.
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Clone)]
pub struct BridgeBuilder {
    /// Controller REST base URL.
    base_url: Option<String>,
    /// Controller API key.
    api_key: Option<String>,
    /// Controller user name.
    user: Option<String>,
    /// Controller password.
    password: Option<String>,
    /// Job status poll interval.
    poll_interval: Duration,
    /// Throttle factor sent after auth.
    throttle: u32,
    /// Delay between reconnect attempts.
    reconnect_delay: Duration,
    /// Room for every notification; `None` broadcasts.
    room: Option<RoomId>,
    /// Chat transport.
    gateway: Option<Arc<dyn ChatGateway>>,
    /// REST client override.
    api: Option<Arc<dyn ControllerApi>>,
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            user: None,
            password: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            throttle: DEFAULT_THROTTLE,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            room: None,
            gateway: None,
            api: None,
        }
    }
}

impl fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("poll_interval", &self.poll_interval)
            .field("throttle", &self.throttle)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("room", &self.room)
            .field("gateway", &self.gateway.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a builder with default timings and no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the controller base URL (`http://` or `https://`).
    #[inline]
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API key. Logins become passive.
    #[inline]
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the user and password for credentialed logins.
    #[inline]
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the job status poll interval.
    #[inline]
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the throttle factor sent after auth.
    #[inline]
    #[must_use]
    pub fn throttle(mut self, factor: u32) -> Self {
        self.throttle = factor;
        self
    }

    /// Sets the delay between reconnect attempts.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sends every notification to `room` instead of broadcasting.
    #[inline]
    #[must_use]
    pub fn room(mut self, room: impl Into<RoomId>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Sets the chat gateway.
    #[inline]
    #[must_use]
    pub fn gateway(mut self, gateway: Arc<dyn ChatGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Replaces the `reqwest` REST client.
    #[inline]
    #[must_use]
    pub fn api(mut self, api: Arc<dyn ControllerApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Builds the bridge with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the base URL, credentials or gateway are
    ///   missing, or a timing is zero
    /// - [`Error::InvalidUrl`] if the base URL does not parse
    /// - [`Error::Http`] if the REST client cannot be built
    pub fn build(self) -> Result<Bridge> {
        let base_url = self.validate_base_url()?;
        let credentials = self.validate_credentials()?;
        self.validate_timings()?;

        let gateway = self.gateway.clone().ok_or_else(|| {
            Error::config("Chat gateway is required. Use .gateway() to set it.")
        })?;

        let api: Arc<dyn ControllerApi> = match self.api.clone() {
            Some(api) => api,
            None => Arc::new(HttpApi::new(base_url.clone(), self.api_key.clone())?),
        };

        Ok(Bridge::new(BridgeConfig {
            base_url,
            credentials,
            api,
            gateway,
            room: self.room,
            poll_interval: self.poll_interval,
            throttle: self.throttle,
            reconnect_delay: self.reconnect_delay,
        }))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeBuilder {
    /// Validates the base URL.
    fn validate_base_url(&self) -> Result<Url> {
        let raw = self.base_url.as_deref().ok_or_else(|| {
            Error::config(
                "Controller URL is required. Use .base_url() to set it.\n\
                 Example: Bridge::builder().base_url(\"http://octopi.local\")",
            )
        })?;

        let url = Url::parse(raw)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Controller URL must be http or https: {raw}"
            )));
        }

        Ok(url)
    }

    /// Validates the credential configuration.
    fn validate_credentials(&self) -> Result<Credentials> {
        let mut credentials = match (&self.user, &self.password) {
            (Some(user), Some(password)) => Credentials::user_password(user, password),
            _ => Credentials::default(),
        };
        if let Some(key) = &self.api_key {
            credentials = credentials.with_api_key(key);
        }

        if !credentials.is_usable() {
            return Err(Error::config(
                "Controller credentials are required. Use .api_key() or .credentials().",
            ));
        }

        Ok(credentials)
    }

    /// Validates poll and reconnect timings.
    fn validate_timings(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::config("Poll interval must be greater than zero"));
        }
        if self.reconnect_delay.is_zero() {
            return Err(Error::config("Reconnect delay must be greater than zero"));
        }
        if self.throttle == 0 {
            return Err(Error::config("Throttle factor must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
