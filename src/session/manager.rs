//! Session lifecycle against the controller.
//!
//! The [`SessionManager`] is the single owner of the current [`Session`].
//! Callers get clones; a reauthentication swaps in a new instance.
//!
//! # Locking
//!
//! The session lives behind an async `RwLock`:
//!
//! - login, reauthentication and logout hold the write lock across the
//!   REST call
//! - token reads and authenticated REST calls hold the read lock
//!
//! A reauthentication in flight therefore suspends every reader until the
//! new session is in place, so no caller can act on a stale token.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::JobStatus;
use crate::transport::ControllerApi;

use super::credentials::Credentials;
use super::login::{LoginRequest, Session};

// ============================================================================
// Constants
// ============================================================================

/// Reauth reasons answered with a passive login.
const PASSIVE_REAUTH_REASONS: [&str; 2] = ["logout", "removed"];

// ============================================================================
// SessionManager
// ============================================================================

/// Owns the controller session and the calls that need it.
pub struct SessionManager {
    /// REST capability.
    api: Arc<dyn ControllerApi>,
    /// Configured identity.
    credentials: Credentials,
    /// Current session; `None` while disconnected.
    session: RwLock<Option<Session>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager with no session.
    #[must_use]
    pub fn new(api: Arc<dyn ControllerApi>, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            session: RwLock::new(None),
        }
    }

    /// Performs the initial login.
    ///
    /// Passive when an API key is configured, user/password otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no credentials are configured
    /// - [`Error::Auth`] if the controller rejects the login
    pub async fn login(&self) -> Result<Session> {
        let request = self.credentials.login_request()?;
        self.replace_session(&request, "login").await
    }

    /// Replaces the session after the controller invalidated it.
    ///
    /// `logout` and `removed` reasons get a passive login; anything else
    /// repeats the initial login.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the controller rejects the login. The
    /// session is cleared in that case.
    pub async fn reauthenticate(&self, reason: &str) -> Result<Session> {
        let request = if PASSIVE_REAUTH_REASONS.contains(&reason) {
            LoginRequest::passive()
        } else {
            self.credentials.login_request()?
        };

        info!(reason, passive = request.is_passive(), "Reauthenticating");
        self.replace_session(&request, "reauthentication").await
    }

    /// Ends the session. Best effort: failures are logged.
    pub async fn logout(&self) {
        let mut guard = self.session.write().await;
        if guard.take().is_none() {
            debug!("Logout skipped, no session");
            return;
        }

        match self.api.logout().await {
            Ok(()) => info!("Logged out of controller"),
            Err(e) => warn!(error = %e, "Logout failed"),
        }
    }

    /// Returns a copy of the current session.
    ///
    /// Waits for any reauthentication in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if there is no session.
    pub async fn current(&self) -> Result<Session> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::auth("not logged in"))
    }

    /// Returns `true` if a session is held.
    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Fetches the current job status under the session read lock.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] if there is no session
    /// - transport or upstream data errors from the REST call
    pub async fn fetch_job(&self) -> Result<JobStatus> {
        let guard = self.session.read().await;
        if guard.is_none() {
            return Err(Error::auth("not logged in"));
        }

        self.api.job().await
    }

    /// Logs in with `request` and swaps the result in under the write lock.
    async fn replace_session(&self, request: &LoginRequest, what: &str) -> Result<Session> {
        let mut guard = self.session.write().await;

        match self.api.login(request).await {
            Ok(session) => {
                info!(user = %session.name, what, "Controller session established");
                *guard = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                *guard = None;
                warn!(error = %e, what, "Controller login failed");
                Err(match e {
                    Error::Auth { .. } => e,
                    other if other.is_transport_error() => other,
                    other => Error::auth(other.to_string()),
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
