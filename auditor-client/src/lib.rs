//! Auditor HTTP Client
//!
//! A small, type-safe HTTP client for the scan API.
//!
//! Every call attaches the current bearer token (when a [`TokenProvider`] is
//! configured and holds one) and maps failures onto the four error kinds of
//! [`ClientError`].
//!
//! # Example
//!
//! ```no_run
//! use auditor_client::AuditorClient;
//! use auditor_core::dto::job::JobListQuery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AuditorClient::new("http://localhost:8000");
//!
//!     let jobs = client.list_jobs(JobListQuery::default()).await?;
//!     println!("{} job(s)", jobs.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod auth;
mod jobs;
mod metrics;
mod source;
mod targets;

// Re-export commonly used types
pub use error::{ClientError, ErrorKind, Result};
pub use source::JobSource;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Read-only access to the current session token
///
/// The client never stores or clears credentials itself; it asks the
/// provider on every request.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// HTTP client for the scan API
///
/// Methods are organized into groups:
/// - Authentication (login, register, me)
/// - Targets (create, list, get, delete)
/// - Jobs and findings (create, list, get, findings)
/// - Metrics
#[derive(Clone)]
pub struct AuditorClient {
    /// Base URL of the API (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Source of the bearer token, if any
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for AuditorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditorClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.tokens.is_some())
            .finish()
    }
}

impl AuditorClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use auditor_client::AuditorClient;
    ///
    /// let client = AuditorClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            tokens: None,
        }
    }

    /// Attach a token provider; its token is sent as `Authorization: Bearer`
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request to `path`, attaching the bearer token when present
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match self.tokens.as_ref().and_then(|t| t.token()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), &error_text));
        }

        Ok(())
    }
}
