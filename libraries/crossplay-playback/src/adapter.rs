//! Provider adapter capability
//!
//! Each streaming provider is wrapped by one long-lived adapter exposing the
//! same transport surface. Vendor callbacks never touch controller state:
//! adapters post normalized [`AdapterEvent`]s through an [`AdapterEventSink`]
//! and the controller consumes them from a single channel.

use crate::error::Result;
use async_trait::async_trait;
use crossplay_core::{Provider, Track};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Request to load a track and start playing it
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Track to play; `track.provider` matches the adapter
    pub track: Track,

    /// Offset to start from
    pub start_position_ms: u64,

    /// Transition token; every event caused by this load must carry it
    pub generation: u64,
}

/// Normalized vendor event
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterEvent {
    pub provider: Provider,
    pub generation: u64,
    pub kind: AdapterEventKind,
}

/// What the vendor reported
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEventKind {
    /// Vendor handshake completed
    Ready { device_id: Option<String> },

    /// Vendor confirmed audio started
    Started,

    /// Playback progress
    PositionTick { position_ms: u64 },

    /// Vendor paused on its own (or was paused outside the app)
    Paused,

    /// Track played to the end
    Finished,

    /// Asynchronous vendor failure
    Error { message: String },
}

/// Sending half handed to an adapter on subscription
#[derive(Debug, Clone)]
pub struct AdapterEventSink {
    provider: Provider,
    tx: mpsc::UnboundedSender<AdapterEvent>,
}

impl AdapterEventSink {
    /// Create a sink stamping events with `provider`
    pub fn new(provider: Provider, tx: mpsc::UnboundedSender<AdapterEvent>) -> Self {
        Self { provider, tx }
    }

    /// Post an event; returns `false` once the controller is gone
    pub fn emit(&self, generation: u64, kind: AdapterEventKind) -> bool {
        self.tx
            .send(AdapterEvent {
                provider: self.provider,
                generation,
                kind,
            })
            .is_ok()
    }

    /// Provider this sink stamps
    pub fn provider(&self) -> Provider {
        self.provider
    }
}

/// Uniform transport surface over one vendor playback SDK
///
/// Implementations are shared (`Arc`) between the controller and their own
/// background tasks, so every method takes `&self`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider this adapter drives
    fn provider(&self) -> Provider;

    /// Register the event sink; called once by the controller
    fn subscribe(&self, sink: AdapterEventSink);

    /// Whether the vendor handshake has completed
    fn is_ready(&self) -> bool;

    /// Bring the vendor up
    ///
    /// Idempotent: a second call on an initialized adapter returns at once
    /// without side effects.
    async fn initialize(&self) -> Result<()>;

    /// Load `request.track` and start playing at `request.start_position_ms`
    async fn load_and_play(&self, request: LoadRequest) -> Result<()>;

    /// Pause; a no-op when nothing is loaded
    async fn pause(&self) -> Result<()>;

    /// Resume the loaded track
    async fn resume(&self) -> Result<()>;

    /// Seek within the loaded track
    async fn seek(&self, position_ms: u64) -> Result<()>;

    /// Apply master volume (`fraction` in `[0, 1]`)
    async fn set_volume(&self, fraction: f32) -> Result<()>;
}

/// Application-scope set of adapters, one per provider
///
/// Built once at startup and injected into the controller, so adapters
/// outlive any UI surface that talks to the controller.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own provider, replacing any previous one
    #[must_use]
    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Register an adapter under its own provider, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    /// Adapter for `provider`
    pub fn get(&self, provider: Provider) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider)
    }

    /// All adapters in provider order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ProviderAdapter>> {
        self.adapters.values()
    }

    /// Registered providers
    pub fn providers(&self) -> Vec<Provider> {
        self.adapters.keys().copied().collect()
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Check if no adapter is registered
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
