//! Playback Events
//!
//! Event-based communication for UI synchronization. The controller queues
//! events while handling a message; they are drained and broadcast once the
//! message is done.

use crate::error::PlaybackErrorKind;
use crate::types::PlaybackStatus;
use crossplay_core::{Provider, Track};
use serde::{Deserialize, Serialize};

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Status changed (idle, loading, playing, paused)
    StateChanged { status: PlaybackStatus },

    /// Cursor moved to another track
    TrackChanged {
        track: Track,
        index: usize,
        previous: Option<Track>,
    },

    /// Position update from the active provider (or a seek)
    PositionUpdate { position_ms: u64, duration_ms: u64 },

    /// Queue contents changed
    QueueChanged { length: usize },

    /// Master volume changed
    VolumeChanged { volume: f32 },

    /// Adapter finished initializing
    ProviderReady {
        provider: Provider,
        device_id: Option<String>,
    },

    /// Adapter failed to initialize; its tracks cannot play this session
    ProviderUnavailable { provider: Provider, message: String },

    /// Current track belongs to an unavailable provider
    TrackUnplayable { track: Track },

    /// Reached the end of the queue
    QueueFinished,

    /// Error occurred during playback
    Error {
        kind: PlaybackErrorKind,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = PlaybackEvent::StateChanged {
            status: PlaybackStatus::Playing,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["status"], "playing");
    }

    #[test]
    fn error_event_carries_kind() {
        let event = PlaybackEvent::Error {
            kind: PlaybackErrorKind::ProviderUnavailable,
            message: "spotify".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "provider_unavailable");
    }
}
