//! Crossplay - Playback Management
//!
//! One queue, two streaming providers.
//!
//! This crate provides:
//! - Cross-provider queue with a movable cursor
//! - Uniform `ProviderAdapter` capability over vendor playback surfaces
//! - Playback session controller (Idle, Loading, Playing, Paused)
//! - Generation fencing of stale adapter events
//! - Session persistence (JSON file or in-memory)
//! - Master volume bridge with server-side persistence
//!
//! # Architecture
//!
//! `crossplay-playback` knows nothing about HTTP or vendor SDKs. Concrete
//! adapters live in `crossplay-providers`; tokens and volume persistence
//! come in through the collaborator traits of `crossplay-core`.
//!
//! The controller is a single task. UI commands, adapter events and its own
//! internal messages all arrive on channels and are handled one at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use crossplay_core::{Provider, Track};
//! use crossplay_playback::{
//!     AdapterRegistry, ControllerConfig, MemoryStore, PlaybackController, PlayerCommand,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> crossplay_playback::Result<()> {
//! let registry = AdapterRegistry::new(); // register adapters here
//! let mut controller = PlaybackController::new(
//!     ControllerConfig::default(),
//!     registry,
//!     Arc::new(MemoryStore::new()),
//! );
//! controller.restore().await;
//!
//! let player = controller.spawn();
//! let track = Track::new("42", Provider::SoundCloud, "https://api.soundcloud.com/tracks/42/stream", "Intro", 90_000);
//! player.send(PlayerCommand::PlayTrack(track)).await?;
//! player.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod adapter;
pub mod controller;
pub mod error;
pub mod events;
pub mod queue;
pub mod session;
pub mod types;
pub mod volume;

pub use adapter::{AdapterEvent, AdapterEventKind, AdapterEventSink, AdapterRegistry, LoadRequest, ProviderAdapter};
pub use controller::{PlaybackController, PlayerCommand, PlayerHandle};
pub use error::{PlaybackError, PlaybackErrorKind, Result};
pub use events::PlaybackEvent;
pub use queue::{CursorMove, Queue};
pub use session::{JsonFileStore, MemoryStore, SessionSnapshot, SessionStore};
pub use types::{ControllerConfig, PlaybackStatus, SessionState};
pub use volume::{clamp_fraction, to_percent, VolumeBridge};
