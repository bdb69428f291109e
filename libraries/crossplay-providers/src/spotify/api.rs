//! Spotify Connect Web API client.
//!
//! Only the player endpoints the adapter needs. Every call fetches a bearer
//! from the token provider first.

use crossplay_core::{Provider, TokenProvider};
use crossplay_playback::{PlaybackError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default Web API base
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com";

/// A Connect device
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    devices: Vec<Device>,
}

/// Currently playing item
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayingItem {
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Player state as reported by `GET /v1/me/player`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerState {
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    pub item: Option<PlayingItem>,
}

#[derive(Debug, Serialize)]
struct PlayBody<'a> {
    uris: [&'a str; 1],
    position_ms: u64,
}

/// Thin client over the player endpoints
pub struct WebApiClient {
    http: Client,
    base: String,
    tokens: Arc<dyn TokenProvider>,
}

impl WebApiClient {
    /// Create a client against `base` (normally [`DEFAULT_API_BASE`])
    pub fn new(base: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let base = base.into().trim_end_matches('/').to_string();
        url::Url::parse(&base)
            .map_err(|e| PlaybackError::transport(Provider::Spotify, format!("invalid API base: {e}")))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(format!("Crossplay/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(request_error)?;

        Ok(Self { http, base, tokens })
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .tokens
            .get_access_token(Provider::Spotify)
            .await
            .map_err(|e| PlaybackError::Token(e.to_string()))?;
        Ok(request.bearer_auth(token))
    }

    /// Send and check the status; a 401 evicts the bearer from the broker's cache
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(request_error)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Spotify rejected the bearer, invalidating cached token");
            self.tokens.invalidate_access_token(Provider::Spotify).await;
        }
        check(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `GET /v1/me/player/devices`
    pub async fn devices(&self) -> Result<Vec<Device>> {
        let request = self.authorized(self.http.get(self.url("/v1/me/player/devices"))).await?;
        let response = self.execute(request).await?;
        let body: DevicesResponse = response.json().await.map_err(request_error)?;
        Ok(body.devices)
    }

    /// `PUT /v1/me/player`: make `device_id` the active device without playing
    pub async fn transfer(&self, device_id: &str) -> Result<()> {
        debug!(device_id, "Transferring playback");
        let request = self
            .authorized(self.http.put(self.url("/v1/me/player")))
            .await?
            .json(&json!({ "device_ids": [device_id], "play": false }));
        self.execute(request).await?;
        Ok(())
    }

    /// `PUT /v1/me/player/play` with a track URI
    pub async fn play(&self, device_id: &str, uri: &str, position_ms: u64) -> Result<()> {
        debug!(device_id, uri, position_ms, "Starting track");
        let request = self
            .authorized(self.http.put(self.url("/v1/me/player/play")))
            .await?
            .query(&[("device_id", device_id)])
            .json(&PlayBody {
                uris: [uri],
                position_ms,
            });
        self.execute(request).await?;
        Ok(())
    }

    /// `PUT /v1/me/player/play` without a body: resume
    pub async fn resume(&self, device_id: &str) -> Result<()> {
        let request = self
            .authorized(self.http.put(self.url("/v1/me/player/play")))
            .await?
            .query(&[("device_id", device_id)])
            .header(reqwest::header::CONTENT_LENGTH, 0);
        self.execute(request).await?;
        Ok(())
    }

    /// `PUT /v1/me/player/pause`
    pub async fn pause(&self, device_id: &str) -> Result<()> {
        let request = self
            .authorized(self.http.put(self.url("/v1/me/player/pause")))
            .await?
            .query(&[("device_id", device_id)])
            .header(reqwest::header::CONTENT_LENGTH, 0);
        self.execute(request).await?;
        Ok(())
    }

    /// `PUT /v1/me/player/seek`
    pub async fn seek(&self, device_id: &str, position_ms: u64) -> Result<()> {
        let request = self
            .authorized(self.http.put(self.url("/v1/me/player/seek")))
            .await?
            .query(&[("device_id", device_id)])
            .query(&[("position_ms", position_ms)])
            .header(reqwest::header::CONTENT_LENGTH, 0);
        self.execute(request).await?;
        Ok(())
    }

    /// `PUT /v1/me/player/volume`
    pub async fn set_volume(&self, device_id: &str, percent: u8) -> Result<()> {
        let request = self
            .authorized(self.http.put(self.url("/v1/me/player/volume")))
            .await?
            .query(&[("device_id", device_id)])
            .query(&[("volume_percent", percent)])
            .header(reqwest::header::CONTENT_LENGTH, 0);
        self.execute(request).await?;
        Ok(())
    }

    /// `GET /v1/me/player`; `None` when no device is active
    pub async fn player_state(&self) -> Result<Option<PlayerState>> {
        let request = self.authorized(self.http.get(self.url("/v1/me/player"))).await?;
        let response = self.execute(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let state = response.json().await.map_err(request_error)?;
        Ok(Some(state))
    }
}

impl std::fmt::Debug for WebApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

fn request_error(e: reqwest::Error) -> PlaybackError {
    PlaybackError::transport(Provider::Spotify, e.to_string())
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PlaybackError::transport(
        Provider::Spotify,
        format!("{} {}", status.as_u16(), body),
    ))
}
