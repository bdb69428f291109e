//! Common test utilities: recording adapters and collaborators
#![allow(dead_code)]

use async_trait::async_trait;
use crossplay_core::{Provider, Track, VolumePersistence};
use crossplay_playback::{
    AdapterEventKind, AdapterEventSink, AdapterRegistry, ControllerConfig, LoadRequest,
    MemoryStore, PlaybackController, PlaybackError, ProviderAdapter, SessionStore,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Adapter call, as seen by the shared log
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Initialize(Provider),
    Load {
        provider: Provider,
        track_id: String,
        start_ms: u64,
        generation: u64,
    },
    Pause(Provider),
    Resume(Provider),
    Seek(Provider, u64),
    Volume(Provider, f32),
}

/// One log shared by every adapter so cross-adapter ordering can be asserted
pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

pub fn clear_log(log: &CallLog) {
    log.lock().unwrap().clear();
}

/// Adapter that records every call and lets tests emit vendor events
pub struct RecordingAdapter {
    provider: Provider,
    log: CallLog,
    sink: Mutex<Option<AdapterEventSink>>,
    ready: AtomicBool,
    last_generation: AtomicU64,
    pub fail_init: AtomicBool,
    pub hang_init: AtomicBool,
    pub fail_load: AtomicBool,
    pub fail_resume: AtomicBool,
    pub fail_seek: AtomicBool,
}

impl RecordingAdapter {
    pub fn new(provider: Provider, log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            provider,
            log,
            sink: Mutex::new(None),
            ready: AtomicBool::new(false),
            last_generation: AtomicU64::new(0),
            fail_init: AtomicBool::new(false),
            hang_init: AtomicBool::new(false),
            fail_load: AtomicBool::new(false),
            fail_resume: AtomicBool::new(false),
            fail_seek: AtomicBool::new(false),
        })
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }

    /// Generation of the most recent load
    pub fn last_generation(&self) -> u64 {
        self.last_generation.load(Ordering::SeqCst)
    }

    /// Emit an event stamped with the latest load's generation
    pub fn emit(&self, kind: AdapterEventKind) {
        self.emit_with(self.last_generation(), kind);
    }

    /// Emit an event with an explicit generation
    pub fn emit_with(&self, generation: u64, kind: AdapterEventKind) {
        let sink = self.sink.lock().unwrap().clone();
        sink.expect("adapter not subscribed").emit(generation, kind);
    }
}

#[async_trait]
impl ProviderAdapter for RecordingAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn subscribe(&self, sink: AdapterEventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> crossplay_playback::Result<()> {
        self.record(Call::Initialize(self.provider));
        if self.hang_init.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(PlaybackError::transport(self.provider, "sdk rejected credentials"));
        }
        self.ready.store(true, Ordering::SeqCst);
        self.emit_with(0, AdapterEventKind::Ready { device_id: None });
        Ok(())
    }

    async fn load_and_play(&self, request: LoadRequest) -> crossplay_playback::Result<()> {
        self.record(Call::Load {
            provider: self.provider,
            track_id: request.track.id.clone(),
            start_ms: request.start_position_ms,
            generation: request.generation,
        });
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(PlaybackError::transport(self.provider, "load rejected"));
        }
        self.last_generation.store(request.generation, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> crossplay_playback::Result<()> {
        self.record(Call::Pause(self.provider));
        Ok(())
    }

    async fn resume(&self) -> crossplay_playback::Result<()> {
        self.record(Call::Resume(self.provider));
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(PlaybackError::transport(self.provider, "resume rejected"));
        }
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> crossplay_playback::Result<()> {
        self.record(Call::Seek(self.provider, position_ms));
        if self.fail_seek.load(Ordering::SeqCst) {
            return Err(PlaybackError::transport(self.provider, "seek rejected"));
        }
        // Vendor still reports the old position during the round-trip
        self.emit(AdapterEventKind::PositionTick { position_ms: 99_999 });
        Ok(())
    }

    async fn set_volume(&self, fraction: f32) -> crossplay_playback::Result<()> {
        self.record(Call::Volume(self.provider, fraction));
        Ok(())
    }
}

/// Volume persistence collaborator that records what it was asked to store
#[derive(Default)]
pub struct RecordingPersistence {
    pub authenticated: AtomicBool,
    pub fail: AtomicBool,
    pub saved: Mutex<Vec<f32>>,
}

impl RecordingPersistence {
    pub fn authenticated() -> Arc<Self> {
        let persistence = Self::default();
        persistence.authenticated.store(true, Ordering::SeqCst);
        Arc::new(persistence)
    }

    pub fn anonymous() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saved(&self) -> Vec<f32> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl VolumePersistence for RecordingPersistence {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn set_user_volume(&self, fraction: f32) -> crossplay_core::Result<()> {
        self.saved.lock().unwrap().push(fraction);
        if self.fail.load(Ordering::SeqCst) {
            return Err(crossplay_core::CoreError::network("backend down"));
        }
        Ok(())
    }
}

// ===== Fixtures =====

pub fn spotify_track(id: &str) -> Track {
    Track::new(id, Provider::Spotify, format!("spotify:track:{id}"), format!("Spotify {id}"), 200_000)
}

pub fn soundcloud_track(id: &str) -> Track {
    Track::new(
        id,
        Provider::SoundCloud,
        format!("https://api.soundcloud.com/tracks/{id}/stream"),
        format!("SoundCloud {id}"),
        150_000,
    )
}

/// Controller wired to one recording adapter per provider
pub struct Harness {
    pub controller: PlaybackController,
    pub spotify: Arc<RecordingAdapter>,
    pub soundcloud: Arc<RecordingAdapter>,
    pub store: Arc<MemoryStore>,
    pub log: CallLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default(), Arc::new(MemoryStore::new()))
    }

    pub fn with_config(config: ControllerConfig, store: Arc<MemoryStore>) -> Self {
        let log = new_log();
        let spotify = RecordingAdapter::new(Provider::Spotify, Arc::clone(&log));
        let soundcloud = RecordingAdapter::new(Provider::SoundCloud, Arc::clone(&log));
        let registry = AdapterRegistry::new()
            .with(spotify.clone() as Arc<dyn ProviderAdapter>)
            .with(soundcloud.clone() as Arc<dyn ProviderAdapter>);
        let controller =
            PlaybackController::new(config, registry, store.clone() as Arc<dyn SessionStore>);

        Self {
            controller,
            spotify,
            soundcloud,
            store,
            log,
        }
    }

    /// Initialize both adapters and forget the startup calls
    pub async fn ready(mut self) -> Self {
        self.controller.initialize_providers().await;
        self.controller.process_pending().await;
        self.controller.drain_events();
        clear_log(&self.log);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        calls(&self.log)
    }

    pub fn clear_calls(&self) {
        clear_log(&self.log);
    }

    pub fn adapter(&self, provider: Provider) -> &Arc<RecordingAdapter> {
        match provider {
            Provider::Spotify => &self.spotify,
            Provider::SoundCloud => &self.soundcloud,
        }
    }
}
