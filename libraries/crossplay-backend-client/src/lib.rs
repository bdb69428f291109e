//! Crossplay Backend Client
//!
//! HTTP client for the Crossplay backend.
//!
//! # Features
//!
//! - **Token broker**: short-lived provider access tokens, cached until
//!   shortly before expiry (`TokenProvider`)
//! - **Settings**: the user's master volume (`VolumePersistence`)
//!
//! # Example
//!
//! ```ignore
//! use crossplay_backend_client::{BackendClient, BackendConfig};
//! use std::sync::Arc;
//!
//! let client = Arc::new(BackendClient::new(
//!     BackendConfig::new("https://crossplay.example.com").with_session_token("session-abc"),
//! )?);
//!
//! // Hand it to the adapters and the controller as collaborator traits
//! let tokens: Arc<dyn crossplay_core::TokenProvider> = client.clone();
//! let volume: Arc<dyn crossplay_core::VolumePersistence> = client;
//! ```

mod client;
mod error;
mod token_cache;
mod types;

pub use client::BackendClient;
pub use error::{BackendClientError, Result};
pub use token_cache::TokenCache;
pub use types::{BackendConfig, ProviderTokenResponse, VolumeRequest};
