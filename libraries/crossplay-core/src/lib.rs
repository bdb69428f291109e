//! Crossplay Core
//!
//! Provider-agnostic types, collaborator traits, and error handling shared by
//! every Crossplay crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Provider`, `Artist`, `TrackKey`
//! - **Collaborator Traits**: `TokenProvider`, `VolumePersistence`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use crossplay_core::{Artist, Provider, Track};
//!
//! let track = Track::new(
//!     "4uLU6hMCjMI75M1A2tKUQC",
//!     Provider::Spotify,
//!     "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
//!     "Never Gonna Give You Up",
//!     212_000,
//! )
//! .with_artist(Artist::new("Rick Astley"));
//!
//! assert_eq!(track.provider, Provider::Spotify);
//! assert_eq!(track.artist_names(), "Rick Astley");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CoreError, Result};
pub use traits::{TokenProvider, VolumePersistence};
pub use types::{Artist, Provider, Track, TrackKey};
