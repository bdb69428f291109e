//! Crossplay CLI Library
//!
//! Terminal front end for the playback coordinator: configuration, the
//! stdin console, and the page that hosts the SoundCloud widget.
//!
//! This library exposes the components for testing purposes.

pub mod app;
pub mod bridge;
pub mod config;
pub mod console;
pub mod error;

pub use config::{AppConfig, BridgeKind};
pub use error::{CliError, Result};
