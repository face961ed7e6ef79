//! Controller credentials.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

use super::login::LoginRequest;

// ============================================================================
// Credentials
// ============================================================================

/// How the bridge identifies itself to the controller.
///
/// An API key takes precedence: with one configured, login is passive and
/// the key is sent as a bearer token on every REST call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Application or user API key.
    api_key: Option<String>,
    /// User name for credentialed login.
    user: Option<String>,
    /// Password for credentialed login.
    password: Option<String>,
}

impl Credentials {
    /// Creates API key credentials.
    #[inline]
    #[must_use]
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Creates user/password credentials.
    #[inline]
    #[must_use]
    pub fn user_password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Adds an API key to existing credentials.
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns the API key, if any.
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Returns `true` if any usable form of identity is configured.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.api_key.is_some() || (self.user.is_some() && self.password.is_some())
    }

    /// Returns the request used for the initial login.
    ///
    /// Passive with an API key, user/password otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if neither form is configured.
    pub fn login_request(&self) -> Result<LoginRequest> {
        if self.api_key.is_some() {
            return Ok(LoginRequest::passive());
        }

        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Ok(LoginRequest::credentials(user, password)),
            _ => Err(Error::config(
                "no API key or user/password configured for the controller",
            )),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
