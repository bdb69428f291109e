//! Crossplay backend client.

use crate::error::{BackendClientError, Result};
use crate::token_cache::TokenCache;
use crate::types::{BackendConfig, ProviderTokenResponse, VolumeRequest};
use async_trait::async_trait;
use crossplay_core::{CoreError, Provider, TokenProvider, VolumePersistence};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

/// Client for the backend's token broker and settings endpoints.
///
/// The backend owns the OAuth exchange with each provider; this client only
/// asks it for short-lived provider access tokens and stores the user's
/// master volume.
///
/// # Example
///
/// ```ignore
/// use crossplay_backend_client::{BackendClient, BackendConfig};
/// use crossplay_core::{Provider, TokenProvider};
///
/// let config = BackendConfig::new("https://crossplay.example.com")
///     .with_session_token("session-abc");
/// let client = BackendClient::new(config)?;
///
/// let token = client.get_access_token(Provider::Spotify).await?;
/// ```
pub struct BackendClient {
    http: Client,
    url: String,
    session_token: Option<String>,
    tokens: TokenCache,
}

impl BackendClient {
    /// Create a new client with the given configuration.
    pub fn new(config: BackendConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(BackendClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let url = config.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BackendClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        url::Url::parse(&url).map_err(|e| BackendClientError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Crossplay/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BackendClientError::Request)?;

        Ok(Self {
            http,
            url,
            session_token: config.session_token,
            tokens: TokenCache::new(config.token_expiry_margin),
        })
    }

    /// Get the backend URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if a user session is configured.
    pub fn has_session(&self) -> bool {
        self.session_token.is_some()
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .session_token
            .as_ref()
            .ok_or(BackendClientError::AuthRequired)?;
        Ok(request.bearer_auth(token))
    }

    /// Fetch a fresh provider access token, bypassing the cache.
    pub async fn fetch_provider_token(&self, provider: Provider) -> Result<ProviderTokenResponse> {
        let url = format!("{}/api/auth/{}/token", self.url, provider.as_str());
        debug!(url = %url, %provider, "Fetching provider token");

        let response = self
            .authorized(self.http.get(&url))?
            .send()
            .await
            .map_err(BackendClientError::from_send)?;
        let response = check_status(response).await?;

        response.json().await.map_err(|e| {
            BackendClientError::ParseError(format!("Failed to parse token response: {}", e))
        })
    }

    /// Provider access token, served from cache while fresh.
    pub async fn provider_token(&self, provider: Provider) -> Result<String> {
        if let Some(token) = self.tokens.get(provider).await {
            return Ok(token);
        }

        let response = self.fetch_provider_token(provider).await?;
        self.tokens
            .insert(
                provider,
                response.access_token.clone(),
                Duration::from_secs(response.expires_in),
            )
            .await;

        info!(%provider, expires_in = response.expires_in, "Provider token refreshed");
        Ok(response.access_token)
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate_token(&self, provider: Provider) {
        self.tokens.invalidate(provider).await;
    }

    /// Store the user's master volume.
    pub async fn put_volume(&self, fraction: f32) -> Result<()> {
        let url = format!("{}/api/settings/volume", self.url);
        debug!(url = %url, volume = fraction, "Saving volume");

        let response = self
            .authorized(self.http.put(&url))?
            .json(&VolumeRequest { volume: fraction })
            .send()
            .await
            .map_err(BackendClientError::from_send)?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendClientError::AuthFailed(message),
        _ => BackendClientError::ServerError {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl TokenProvider for BackendClient {
    async fn get_access_token(&self, provider: Provider) -> crossplay_core::Result<String> {
        self.provider_token(provider)
            .await
            .map_err(|e| CoreError::token(provider, e.to_string()))
    }

    async fn invalidate_access_token(&self, provider: Provider) {
        self.invalidate_token(provider).await;
    }
}

#[async_trait]
impl VolumePersistence for BackendClient {
    fn is_authenticated(&self) -> bool {
        self.has_session()
    }

    async fn set_user_volume(&self, fraction: f32) -> crossplay_core::Result<()> {
        self.put_volume(fraction).await.map_err(CoreError::from)
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("url", &self.url)
            .field("session", &self.session_token.is_some())
            .finish_non_exhaustive()
    }
}
