//! Error types for backend API operations.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors produced by the API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection refused, reset, timeout, body read error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization of a response body failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-success status
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The stream was cancelled client-side before completion
    #[error("stream cancelled")]
    Cancelled,
}

impl ApiError {
    /// Whether this error is a client-initiated cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}
