//! Error types for the backend client.

use crossplay_core::CoreError;
use thiserror::Error;

/// Errors that can occur when talking to the Crossplay backend.
#[derive(Error, Debug)]
pub enum BackendClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// No user session configured
    #[error("Authentication required")]
    AuthRequired,

    /// Session rejected by the backend
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Invalid backend URL
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse backend response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Backend is offline or unreachable
    #[error("Backend unreachable: {0}")]
    ServerUnreachable(String),
}

impl BackendClientError {
    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::ServerUnreachable(e.to_string())
        } else {
            Self::Request(e)
        }
    }
}

impl From<BackendClientError> for CoreError {
    fn from(e: BackendClientError) -> Self {
        match e {
            BackendClientError::AuthRequired => CoreError::NotAuthenticated,
            BackendClientError::InvalidUrl(msg) => CoreError::InvalidInput(msg),
            other => CoreError::Network(other.to_string()),
        }
    }
}

/// Result type for backend client operations.
pub type Result<T> = std::result::Result<T, BackendClientError>;
