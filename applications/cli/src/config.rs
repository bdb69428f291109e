//! Application configuration

use crate::error::{CliError, Result};
use crossplay_backend_client::BackendConfig;
use crossplay_playback::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "crossplay.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub spotify: SpotifySettings,

    #[serde(default)]
    pub soundcloud: SoundCloudSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Session token; without it the player runs anonymously
    #[serde(default)]
    pub session_token: Option<String>,

    #[serde(default = "default_token_expiry_margin_secs")]
    pub token_expiry_margin_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotifySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_spotify_api_base")]
    pub api_base: String,

    /// Connect device to look up by name
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Known device id; skips the name lookup
    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_device_poll_ms")]
    pub device_poll_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeKind {
    /// Host page served over HTTP, widget relayed through a websocket
    #[default]
    Ws,
    /// Newline-delimited JSON over a raw TCP socket
    Tcp,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoundCloudSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub bridge: BridgeKind,

    #[serde(default = "default_bridge_addr")]
    pub bridge_addr: SocketAddr,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Session file; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    #[serde(default)]
    pub resume_on_ready: bool,

    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given; otherwise `crossplay.toml` in the
    /// working directory is used if present. Environment variables prefixed
    /// with `CROSSPLAY_` override both, with `__` between section and key
    /// (`CROSSPLAY_BACKEND__SESSION_TOKEN`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CROSSPLAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(CliError::Config("backend.base_url is required".to_string()));
        }

        if !(0.0..=1.0).contains(&self.playback.initial_volume) {
            return Err(CliError::Config(format!(
                "playback.initial_volume must be within 0..=1, got {}",
                self.playback.initial_volume
            )));
        }

        if self.playback.ready_timeout_ms == 0 {
            return Err(CliError::Config(
                "playback.ready_timeout_ms must be positive".to_string(),
            ));
        }

        if self.spotify.enabled && self.spotify.poll_interval_ms == 0 {
            return Err(CliError::Config(
                "spotify.poll_interval_ms must be positive".to_string(),
            ));
        }

        if !self.spotify.enabled && !self.soundcloud.enabled {
            return Err(CliError::Config("at least one provider must be enabled".to_string()));
        }

        Ok(())
    }

    pub fn backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(self.backend.base_url.clone())
            .with_expiry_margin(Duration::from_secs(self.backend.token_expiry_margin_secs));
        config.timeout = Duration::from_secs(self.backend.timeout_secs);
        match &self.backend.session_token {
            Some(token) if !token.is_empty() => config.with_session_token(token.clone()),
            _ => config,
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            resume_on_ready: self.playback.resume_on_ready,
            initial_volume: self.playback.initial_volume,
            ready_timeout: Duration::from_millis(self.playback.ready_timeout_ms),
            ..ControllerConfig::default()
        }
    }

    /// Resolved session file location
    pub fn session_path(&self) -> PathBuf {
        self.session.path.clone().unwrap_or_else(default_session_path)
    }
}

// Default values
fn default_backend_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_token_expiry_margin_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_enabled() -> bool {
    true
}

fn default_spotify_api_base() -> String {
    crossplay_providers::spotify::DEFAULT_API_BASE.to_string()
}

fn default_device_name() -> String {
    "Crossplay".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_device_poll_ms() -> u64 {
    1000
}

fn default_bridge_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7878))
}

fn default_initial_volume() -> f32 {
    0.5
}

fn default_ready_timeout_ms() -> u64 {
    10_000
}

fn default_session_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crossplay")
        .join("session.json")
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            session_token: None,
            token_expiry_margin_secs: default_token_expiry_margin_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_base: default_spotify_api_base(),
            device_name: default_device_name(),
            device_id: None,
            poll_interval_ms: default_poll_interval_ms(),
            device_poll_ms: default_device_poll_ms(),
        }
    }
}

impl Default for SoundCloudSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bridge: BridgeKind::default(),
            bridge_addr: default_bridge_addr(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            resume_on_ready: false,
            ready_timeout_ms: default_ready_timeout_ms(),
        }
    }
}
