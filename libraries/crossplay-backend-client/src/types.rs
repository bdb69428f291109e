//! Types for backend API requests and responses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for connecting to the backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g., "https://crossplay.example.com")
    pub url: String,
    /// User session token; absent for anonymous use
    pub session_token: Option<String>,
    /// Treat provider tokens as expired this long before they really are
    pub token_expiry_margin: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl BackendConfig {
    /// Create a config for an anonymous session.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_token: None,
            token_expiry_margin: Duration::from_secs(60),
            timeout: Duration::from_secs(15),
        }
    }

    /// Attach a user session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Override the token expiry margin.
    #[must_use]
    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.token_expiry_margin = margin;
        self
    }
}

/// Response from the provider token broker.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTokenResponse {
    pub access_token: String,
    /// Token validity in seconds
    pub expires_in: u64,
}

/// Request body for the volume setting.
#[derive(Debug, Serialize)]
pub struct VolumeRequest {
    /// Fraction in `[0, 1]`
    pub volume: f32,
}
