//! Error types for playback management

use crossplay_core::{CoreError, Provider};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Adapter failed to initialize and is disabled for this session
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(Provider),

    /// Adapter has not finished its readiness handshake
    #[error("Provider not ready: {0}")]
    NotReady(Provider),

    /// No adapter registered for the provider
    #[error("No adapter registered for {0}")]
    NoAdapter(Provider),

    /// Vendor rejected a transport call
    #[error("{provider} transport error: {message}")]
    Transport { provider: Provider, message: String },

    /// Bearer token could not be obtained
    #[error("Token error: {0}")]
    Token(String),

    /// Vendor readiness did not arrive in time
    #[error("Timed out waiting for {0}")]
    Timeout(Provider),

    /// Session store failure
    #[error("Session store error: {0}")]
    Session(String),

    /// Controller task has stopped
    #[error("Playback controller stopped")]
    ControllerStopped,

    /// Collaborator error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlaybackError {
    /// Create a transport error
    pub fn transport(provider: Provider, msg: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            message: msg.into(),
        }
    }

    /// Category of this error, for publishing to the UI
    pub fn kind(&self) -> PlaybackErrorKind {
        match self {
            Self::ProviderUnavailable(_) | Self::NoAdapter(_) => {
                PlaybackErrorKind::ProviderUnavailable
            }
            Self::NotReady(_) => PlaybackErrorKind::NotReady,
            Self::Transport { .. } => PlaybackErrorKind::Transport,
            Self::Token(_) | Self::Core(CoreError::Token { .. }) => PlaybackErrorKind::Token,
            Self::Timeout(_) => PlaybackErrorKind::Timeout,
            Self::Session(_) | Self::Io(_) | Self::Json(_) => PlaybackErrorKind::Session,
            Self::Core(_) | Self::ControllerStopped => PlaybackErrorKind::Other,
        }
    }
}

/// Serializable error category carried by `PlaybackEvent::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackErrorKind {
    ProviderUnavailable,
    NotReady,
    Transport,
    Token,
    Timeout,
    Session,
    Other,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_map_to_token_kind() {
        let core = CoreError::token(Provider::Spotify, "expired");
        assert_eq!(PlaybackError::from(core).kind(), PlaybackErrorKind::Token);
        assert_eq!(
            PlaybackError::Token("no session".into()).kind(),
            PlaybackErrorKind::Token
        );
    }

    #[test]
    fn missing_adapter_counts_as_unavailable() {
        assert_eq!(
            PlaybackError::NoAdapter(Provider::SoundCloud).kind(),
            PlaybackErrorKind::ProviderUnavailable
        );
    }
}
