//! Collaborator traits implemented outside the playback core

use crate::error::Result;
use crate::types::Provider;
use async_trait::async_trait;

/// Source of provider bearer tokens
///
/// Implementers broker tokens from the backend (which owns the OAuth
/// exchange). Adapters call this before every transport call that needs a
/// bearer; a failure must surface as a playback error, not a retry loop.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a valid access token for `provider`
    async fn get_access_token(&self, provider: Provider) -> Result<String>;

    /// Forget any cached token for `provider` after the vendor rejected it
    async fn invalidate_access_token(&self, _provider: Provider) {}
}

/// Server-side storage of the user's master volume
#[async_trait]
pub trait VolumePersistence: Send + Sync {
    /// Whether a user session exists; anonymous users keep volume local
    fn is_authenticated(&self) -> bool;

    /// Persist the master volume (fraction in `[0, 1]`)
    async fn set_user_volume(&self, fraction: f32) -> Result<()>;
}
