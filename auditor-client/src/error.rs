//! Error types for the Auditor client
//!
//! Every failure is mapped onto one of four kinds. Callers decide what to do
//! from the kind alone: transient network failures are retried, auth failures
//! go to the session guard, validation failures are shown to the user and
//! not-found ends observation of a resource.

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the scan API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connectivity problem, timeout, 5xx or undecodable response
    #[error("Network error: {0}")]
    Network(String),

    /// Credential missing, invalid or expired
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The API rejected the request payload
    #[error("Invalid request (status {status}): {message}")]
    Validation {
        /// HTTP status code, 0 when rejected before sending
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),
}

/// Coarse classification of a [`ClientError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    Validation,
    NotFound,
}

impl ClientError {
    /// Classify a non-success HTTP status and its body
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_detail(body);
        match status {
            401 | 403 => Self::Auth(message),
            404 => Self::NotFound(message),
            408 | 429 => Self::Network(format!("status {}: {}", status, message)),
            400..=499 => Self::Validation { status, message },
            _ => Self::Network(format!("status {}: {}", status, message)),
        }
    }

    /// Validation failure detected before any request was sent
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            status: 0,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Check if this error means the session is no longer valid
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), &err.to_string());
        }
        Self::Network(err.to_string())
    }
}

/// Pull the human readable message out of an API error body
///
/// The API answers `{"detail": "..."}`; validation errors carry a list of
/// `{"msg": ...}` objects instead. Anything else is returned verbatim.
fn extract_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "Unknown error".to_string();
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return trimmed.to_string();
    };

    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                trimmed.to_string()
            } else {
                messages.join("; ")
            }
        }
        _ => trimmed.to_string(),
    }
}
