//! Core types for playback management

use crossplay_core::{Provider, Track};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback session status
///
/// `Finished` is not a resting state: a finished track collapses straight
/// into `Loading` (next track) or `Idle` (queue exhausted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing to play
    #[default]
    Idle,

    /// Transport call issued, vendor has not confirmed playback yet
    Loading,

    /// Vendor confirmed audio is playing
    Playing,

    /// Track selected but not playing
    Paused,
}

/// Observable session state, published after every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    pub current_index: Option<usize>,
    pub queue: Vec<Track>,
    pub is_playing: bool,
    pub position_ms: u64,
    pub active_provider: Option<Provider>,
    pub is_seeking: bool,
    /// Master volume in `[0, 1]`
    pub volume: f32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current_track: None,
            current_index: None,
            queue: Vec::new(),
            is_playing: false,
            position_ms: 0,
            active_provider: None,
            is_seeking: false,
            volume: ControllerConfig::default().initial_volume,
        }
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Load the restored track as soon as its provider is ready (default: false)
    pub resume_on_ready: bool,

    /// Master volume applied after initialization (default: 0.5)
    pub initial_volume: f32,

    /// Upper bound on adapter initialization (default: 10s)
    pub ready_timeout: Duration,

    /// UI command channel capacity (default: 64)
    pub command_capacity: usize,

    /// Broadcast event channel capacity (default: 256)
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resume_on_ready: false,
            initial_volume: 0.5,
            ready_timeout: Duration::from_secs(10),
            command_capacity: 64,
            event_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ControllerConfig::default();
        assert!(!config.resume_on_ready);
        assert_eq!(config.initial_volume, 0.5);
        assert_eq!(config.ready_timeout, Duration::from_secs(10));
    }

    #[test]
    fn default_state_is_idle_and_empty() {
        let state = SessionState::default();
        assert_eq!(state.status, PlaybackStatus::Idle);
        assert!(state.current_index.is_none());
        assert!(!state.is_playing);
    }
}
