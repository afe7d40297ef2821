//! Rerank error types and propagation policy.
//!
//! # Error Taxonomy
//!
//! | Error | Cause | Surfaced to caller? |
//! |-------|-------|---------------------|
//! | `Validation` | Malformed request (missing query, empty items) | Yes, HTTP 400 |
//! | `Upstream` | Neural reranker failed or returned garbage | No, math fallback |
//! | `Cache` | Key-value store read/write failure | No, treated as miss |
//! | `Network` / `Timeout` | Transport failure to an external service | No, recovered locally |
//! | `Config` | Invalid configuration file or values | Startup only |
//! | `Internal` | Anything else | Yes, HTTP 500 with a generic body |
//!
//! The system prefers a degraded-but-correct answer (math ranking) over a
//! failed request, so only `Validation` and `Internal` ever reach a caller.

use thiserror::Error;

/// Result type for rerank operations.
pub type Result<T> = std::result::Result<T, RerankError>;

/// Errors that can occur while reranking.
#[derive(Debug, Error)]
pub enum RerankError {
    /// Malformed request; user-correctable.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Neural inference capability failed or returned a malformed response.
    #[error("Upstream reranker failure: {0}")]
    Upstream(String),

    /// Result cache store failure.
    #[error("Cache failure: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout waiting on an external service.
    #[error("Request timed out")]
    Timeout,

    /// Unhandled internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for RerankError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RerankError::Timeout
        } else if err.is_connect() {
            RerankError::Network(format!("Connection failed: {}", err))
        } else {
            RerankError::Network(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for RerankError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RerankError::Timeout
    }
}

impl RerankError {
    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this error is absorbed locally (fallback or cache miss)
    /// instead of failing the request.
    ///
    /// # Example
    ///
    /// ```
    /// use edgequake_rerank::RerankError;
    ///
    /// assert!(RerankError::Timeout.is_recoverable());
    /// assert!(!RerankError::validation("empty items").is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_)
                | Self::Cache(_)
                | Self::Network(_)
                | Self::Timeout
                | Self::Serialization(_)
        )
    }

    /// HTTP status code for this error when it reaches the HTTP surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Message safe to return to a caller. Internal details are never leaked.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            _ => "Internal server error".to_string(),
        }
    }
}
