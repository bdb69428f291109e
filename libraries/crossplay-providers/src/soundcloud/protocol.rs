//! Widget bridge messages
//!
//! The SoundCloud widget runs in an embedded page. The page relays widget
//! API calls and widget events as one JSON object per message.

use serde::{Deserialize, Serialize};

/// Widget events the page should forward
pub const BOUND_EVENTS: [&str; 5] = ["ready", "play", "playProgress", "pause", "finish"];

/// Call into the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum WidgetCommand {
    /// Subscribe to widget events
    Bind { events: Vec<String> },

    /// Replace the widget source
    #[serde(rename_all = "camelCase")]
    Load { url: String, auto_play: bool },

    Play,
    Pause,

    SeekTo { milliseconds: u64 },

    /// Volume as a fraction in `[0, 1]`
    SetVolume { volume: f32 },
}

impl WidgetCommand {
    /// Bind every event the adapter consumes
    pub fn bind_all() -> Self {
        Self::Bind {
            events: BOUND_EVENTS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Event reported by the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum WidgetMessage {
    Ready,
    Play,
    #[serde(rename_all = "camelCase")]
    PlayProgress {
        current_position: u64,
        #[serde(default)]
        relative_position: Option<f64>,
    },
    Pause,
    Finish,
    Error { message: String },
}
