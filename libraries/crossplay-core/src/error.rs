//! Core error types for Crossplay

use crate::types::Provider;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Crossplay
#[derive(Error, Debug)]
pub enum CoreError {
    /// Access token could not be obtained for a provider
    #[error("Token unavailable for {provider}: {message}")]
    Token {
        /// Provider the token was requested for
        provider: Provider,
        /// Failure detail
        message: String,
    },

    /// Network errors talking to a collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Caller is not authenticated with the backend
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Create a token error
    pub fn token(provider: Provider, msg: impl Into<String>) -> Self {
        Self::Token {
            provider,
            message: msg.into(),
        }
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
