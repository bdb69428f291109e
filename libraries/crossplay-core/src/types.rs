//! Track and provider domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

/// Streaming provider a track originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Spotify Connect device
    Spotify,
    /// SoundCloud embedded widget
    SoundCloud,
}

impl Provider {
    /// Every supported provider, in registration order
    pub const ALL: [Provider; 2] = [Provider::Spotify, Provider::SoundCloud];

    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spotify => "spotify",
            Self::SoundCloud => "soundcloud",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spotify" => Ok(Self::Spotify),
            "soundcloud" => Ok(Self::SoundCloud),
            other => Err(CoreError::invalid_input(format!("unknown provider: {other}"))),
        }
    }
}

/// Credited artist of a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// Display name
    pub name: String,

    /// Link to the artist page on the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
}

impl Artist {
    /// Create an artist without a profile link
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_url: None,
        }
    }

    /// Attach a profile link
    #[must_use]
    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }
}

/// A playable unit from one provider
///
/// Tracks are resolved upstream (search, favorites, playlists) and arrive
/// carrying everything an adapter needs. Identity is `(id, provider)`; the
/// same track may sit in a queue more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Provider-scoped identifier
    pub id: String,

    /// Provider the track streams from
    pub provider: Provider,

    /// Opaque handle passed to the adapter (Spotify URI or SoundCloud stream URL)
    pub play_uri: String,

    /// Track title
    pub title: String,

    /// Credited artists, in display order
    #[serde(default)]
    pub artists: Vec<Artist>,

    /// Cover art
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Track duration in milliseconds
    pub duration_ms: u64,
}

impl Track {
    /// Create a track with minimal metadata
    pub fn new(
        id: impl Into<String>,
        provider: Provider,
        play_uri: impl Into<String>,
        title: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            play_uri: play_uri.into(),
            title: title.into(),
            artists: Vec::new(),
            image_url: None,
            duration_ms,
        }
    }

    /// Append a credited artist
    #[must_use]
    pub fn with_artist(mut self, artist: Artist) -> Self {
        self.artists.push(artist);
        self
    }

    /// Set the cover art
    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Identity key of this track
    pub fn key(&self) -> TrackKey {
        TrackKey {
            id: self.id.clone(),
            provider: self.provider,
        }
    }

    /// Whether `self` and `other` are the same provider track
    pub fn same_as(&self, other: &Track) -> bool {
        self.matches(&other.id, other.provider)
    }

    /// Whether this track has the given identity
    pub fn matches(&self, id: &str, provider: Provider) -> bool {
        self.provider == provider && self.id == id
    }

    /// Get the track duration as a Duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Artist names joined for display
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Identity of a track across providers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    /// Provider-scoped identifier
    pub id: String,
    /// Owning provider
    pub provider: Provider,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}
