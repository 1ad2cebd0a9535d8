//! Error types for the model-management and completion clients
//!
//! Every failure a call or stream can produce is one `ClientError` variant.
//! Upstream error bodies are mapped onto these variants by
//! [`crate::models::classify`].

use thiserror::Error;

/// Maximum number of body characters kept in an error for context
pub const MAX_SNIPPET_CHARS: usize = 512;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// The requested model is absent upstream
    #[error("Model '{name}' not found: {message}")]
    ModelNotFound { name: String, message: String },

    /// Non-success HTTP status that is not a missing model
    #[error("Request failed with HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Response body (or one streamed line) did not match the expected JSON shape
    #[error("Failed to decode response: {reason} (input: {snippet})")]
    DecodeFailed { reason: String, snippet: String },

    /// Connection reset, read failure or truncated stream
    #[error("Transport failure: {0}")]
    TransportFailed(String),

    /// Connection could not be established
    #[error("Service unavailable at {url}: {reason}")]
    ServiceUnavailable { url: String, reason: String },

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Build a `DecodeFailed` from a serde error and the offending input
    pub fn decode(err: &serde_json::Error, input: &[u8]) -> Self {
        ClientError::DecodeFailed {
            reason: err.to_string(),
            snippet: snippet(&String::from_utf8_lossy(input)),
        }
    }

    /// True when the failure means "resource absent" rather than a transient problem
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::ModelNotFound { .. })
    }

    /// True for connection-level failures
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::TransportFailed(_) | ClientError::ServiceUnavailable { .. }
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ClientError::ServiceUnavailable {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
                reason: err.to_string(),
            }
        } else if err.is_decode() {
            ClientError::DecodeFailed {
                reason: err.to_string(),
                snippet: String::new(),
            }
        } else {
            ClientError::TransportFailed(err.to_string())
        }
    }
}

/// Truncate text to at most [`MAX_SNIPPET_CHARS`] characters
pub fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
