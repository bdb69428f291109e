//! Crossplay - Provider Adapters
//!
//! Concrete [`ProviderAdapter`](crossplay_playback::ProviderAdapter)
//! implementations:
//!
//! - [`spotify`]: Spotify Connect driven through the Web API, with a
//!   position poller while playing
//! - [`soundcloud`]: the SoundCloud widget driven over a message bridge to
//!   the page hosting it
//!
//! Access tokens come from a [`TokenProvider`](crossplay_core::TokenProvider),
//! normally the backend client.

#![forbid(unsafe_code)]

pub mod soundcloud;
pub mod spotify;

pub use soundcloud::SoundCloudAdapter;
pub use spotify::SpotifyAdapter;
