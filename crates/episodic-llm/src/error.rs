//! Error types for oracle calls

use thiserror::Error;

/// Errors raised by language and embedding oracles
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connection refused, reset, DNS, ...)
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The provider answered with a non-success status
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the provider
        body: String,
    },

    /// The call did not finish within the configured timeout
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout that expired
        timeout_ms: u64,
    },

    /// The provider answered but the payload was not what we expected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Misconfiguration (unknown provider, missing model, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The oracle is temporarily unable to serve requests
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::Timeout { .. } | LlmError::Unavailable(_) => true,
            LlmError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            LlmError::InvalidResponse(_) | LlmError::Config(_) => false,
        }
    }
}

#[cfg(feature = "openai")]
impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout {
                operation: "http_request".to_string(),
                timeout_ms: 0,
            }
        } else if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Http(err.to_string())
        }
    }
}

impl From<config::ConfigError> for LlmError {
    fn from(err: config::ConfigError) -> Self {
        LlmError::Config(err.to_string())
    }
}

/// Result alias for oracle operations
pub type LlmResult<T> = std::result::Result<T, LlmError>;
