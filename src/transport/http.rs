//! Controller REST API.
//!
//! The bridge needs three endpoints:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/api/login` | Passive or user/password login |
//! | `POST` | `/api/logout` | End the session |
//! | `GET` | `/api/job` | Current job status |
//!
//! [`ControllerApi`] is the capability the rest of the crate depends on;
//! [`HttpApi`] implements it with `reqwest`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::JobStatus;
use crate::session::{LoginRequest, Session};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for a single REST call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ControllerApi
// ============================================================================

/// REST operations the bridge performs against the controller.
#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// Logs in and returns the new session.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] on a non-success status or malformed body
    /// - [`Error::Http`] on transport failure
    async fn login(&self, request: &LoginRequest) -> Result<Session>;

    /// Ends the current session.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request fails.
    async fn logout(&self) -> Result<()>;

    /// Fetches the current job status.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request fails, or
    /// [`Error::UpstreamData`] if the body is not a job status.
    async fn job(&self) -> Result<JobStatus>;
}

// ============================================================================
// HttpApi
// ============================================================================

/// `reqwest` implementation of [`ControllerApi`].
///
/// With an API key configured every request carries
/// `Authorization: Bearer <key>`. Without one, the session cookie set by
/// login is kept in the client's cookie store and replayed.
#[derive(Debug, Clone)]
pub struct HttpApi {
    /// HTTP client with cookie store.
    client: Client,
    /// Controller base URL.
    base_url: Url,
    /// API key sent as bearer token.
    api_key: Option<String>,
}

impl HttpApi {
    /// Creates a client for the controller at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client cannot be built.
    pub fn new(base_url: Url, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Returns the controller base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the absolute URL of an API endpoint.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("/api/{path}"));
        url.set_query(None);
        url
    }

    /// Builds a request with the bearer header attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        trace!(%method, path, "API request");

        let builder = self.client.request(method, self.endpoint(path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Maps a non-success status to [`Error::HttpStatus`].
    fn check_status(response: Response, path: &str) -> Result<Response> {
        let status = response.status();
        debug!(status = status.as_u16(), path, "API response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::http_status(status.as_u16(), format!("/api/{path}")))
        }
    }
}

#[async_trait]
impl ControllerApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<Session> {
        let response = self
            .request(Method::POST, "login")
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response, "login").map_err(|e| Error::auth(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("malformed login response: {e}")))?;

        Session::from_login_body(&body)
    }

    async fn logout(&self) -> Result<()> {
        let response = self.request(Method::POST, "logout").send().await?;
        Self::check_status(response, "logout")?;
        Ok(())
    }

    async fn job(&self) -> Result<JobStatus> {
        let response = self.request(Method::GET, "job").send().await?;
        let body: Value = Self::check_status(response, "job")?.json().await?;

        JobStatus::from_value(body).map_err(|e| Error::upstream_data(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
