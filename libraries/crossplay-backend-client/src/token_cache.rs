//! Provider access tokens cached until shortly before they expire.

use crossplay_core::Provider;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// TTL cache keyed by provider
#[derive(Debug)]
pub struct TokenCache {
    margin: Duration,
    tokens: RwLock<HashMap<Provider, CachedToken>>,
}

impl TokenCache {
    /// Entries are treated as stale `margin` before their real expiry
    pub fn new(margin: Duration) -> Self {
        Self {
            margin,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Cached token for `provider`, if still fresh
    pub async fn get(&self, provider: Provider) -> Option<String> {
        let tokens = self.tokens.read().await;
        tokens
            .get(&provider)
            .filter(|cached| Instant::now() < cached.refresh_at)
            .map(|cached| cached.token.clone())
    }

    /// Store a token valid for `expires_in`
    pub async fn insert(&self, provider: Provider, token: String, expires_in: Duration) {
        let refresh_at = Instant::now() + expires_in.saturating_sub(self.margin);
        self.tokens
            .write()
            .await
            .insert(provider, CachedToken { token, refresh_at });
    }

    /// Forget the token for `provider`
    pub async fn invalidate(&self, provider: Provider) {
        self.tokens.write().await.remove(&provider);
    }
}
