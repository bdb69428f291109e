//! Spotify adapter over the Connect Web API
//!
//! The vendor does not push position, so a poller task reads the player
//! state on an interval while a track is playing. The poller is cancelled on
//! pause, on every new load and when the adapter is dropped, so at most one
//! runs at a time.

use super::api::{PlayerState, WebApiClient};
use super::device::DeviceConnector;
use async_trait::async_trait;
use crossplay_core::Provider;
use crossplay_playback::{
    to_percent, AdapterEventKind, AdapterEventSink, LoadRequest, PlaybackError, ProviderAdapter,
    Result,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default position polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Consecutive failed polls before the adapter reports an error
const MAX_POLL_FAILURES: u32 = 3;

#[derive(Debug, Clone)]
struct Loaded {
    uri: String,
    generation: u64,
}

#[derive(Debug, Default)]
struct PlayerSlot {
    device_id: Option<String>,
    pending: Option<LoadRequest>,
    // Queued load was paused before the handshake; flushed by resume only
    pending_paused: bool,
    loaded: Option<Loaded>,
    playing: bool,
    volume_percent: Option<u8>,
    poller: Option<CancellationToken>,
}

struct Shared {
    api: WebApiClient,
    sink: Mutex<Option<AdapterEventSink>>,
    slot: Mutex<PlayerSlot>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, PlayerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, generation: u64, kind: AdapterEventKind) {
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sink {
            Some(sink) => {
                sink.emit(generation, kind);
            }
            None => debug!(?kind, "No subscriber for Spotify event"),
        }
    }

    /// Poller saw playback stop on its own
    fn stopped(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.loaded.as_ref().is_some_and(|l| l.generation == generation) {
            slot.playing = false;
            slot.poller = None;
        }
    }
}

/// What one poll of the player state means for the loaded track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observation {
    /// Vendor has not switched to the track yet (or has no device)
    Waiting,
    Progress(u64),
    Paused,
    Finished,
}

fn observe(state: Option<&PlayerState>, uri: &str, progressed: bool) -> Observation {
    let Some(state) = state else {
        return Observation::Waiting;
    };
    let on_track = state.item.as_ref().is_some_and(|item| item.uri == uri);
    let progress = state.progress_ms.unwrap_or(0);

    if !on_track {
        // Moved on to something else after playing ours
        return if progressed {
            Observation::Finished
        } else {
            Observation::Waiting
        };
    }
    if state.is_playing {
        Observation::Progress(progress)
    } else if !progressed {
        Observation::Waiting
    } else if progress == 0 {
        Observation::Finished
    } else {
        Observation::Paused
    }
}

async fn poll(
    shared: Arc<Shared>,
    uri: String,
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut progressed = false;
    let mut failures = 0;

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let state = match shared.api.player_state().await {
            Ok(state) => {
                failures = 0;
                state
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, failures, "Spotify poll failed");
                if failures >= MAX_POLL_FAILURES && !cancel.is_cancelled() {
                    shared.stopped(generation);
                    shared.emit(generation, AdapterEventKind::Error { message: e.to_string() });
                    return;
                }
                continue;
            }
        };
        if cancel.is_cancelled() {
            return;
        }

        match observe(state.as_ref(), &uri, progressed) {
            Observation::Waiting => {}
            Observation::Progress(position_ms) => {
                progressed |= position_ms > 0;
                shared.emit(generation, AdapterEventKind::PositionTick { position_ms });
            }
            Observation::Paused => {
                debug!(generation, "Spotify paused outside the app");
                shared.stopped(generation);
                shared.emit(generation, AdapterEventKind::Paused);
                return;
            }
            Observation::Finished => {
                debug!(generation, "Spotify track finished");
                shared.stopped(generation);
                shared.emit(generation, AdapterEventKind::Finished);
                return;
            }
        }
    }
}

/// Spotify provider adapter
pub struct SpotifyAdapter {
    shared: Arc<Shared>,
    connector: Box<dyn DeviceConnector>,
    poll_interval: Duration,
    init: OnceCell<()>,
}

impl SpotifyAdapter {
    pub fn new(api: WebApiClient, connector: Box<dyn DeviceConnector>) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                sink: Mutex::new(None),
                slot: Mutex::new(PlayerSlot::default()),
            }),
            connector,
            poll_interval: DEFAULT_POLL_INTERVAL,
            init: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Device id reported by the handshake
    pub fn device_id(&self) -> Option<String> {
        self.shared.slot().device_id.clone()
    }

    async fn handshake(&self) -> Result<()> {
        let device_id = self.connector.connect(&self.shared.api).await?;
        self.shared.api.transfer(&device_id).await?;

        let (pending, volume) = {
            let mut slot = self.shared.slot();
            slot.device_id = Some(device_id.clone());
            let pending = if slot.pending_paused {
                None
            } else {
                slot.pending.take()
            };
            (pending, slot.volume_percent)
        };
        info!(device_id = %device_id, "Spotify ready");
        self.shared.emit(
            0,
            AdapterEventKind::Ready {
                device_id: Some(device_id.clone()),
            },
        );

        if let Some(percent) = volume {
            if let Err(e) = self.shared.api.set_volume(&device_id, percent).await {
                warn!(error = %e, "Failed to apply queued volume");
            }
        }
        if let Some(request) = pending {
            let generation = request.generation;
            debug!(track = %request.track.key(), "Flushing queued load");
            if let Err(e) = self.start(&device_id, request).await {
                self.shared
                    .emit(generation, AdapterEventKind::Error { message: e.to_string() });
            }
        }
        Ok(())
    }

    async fn start(&self, device_id: &str, request: LoadRequest) -> Result<()> {
        let uri = request.track.play_uri;
        let generation = request.generation;
        self.shared
            .api
            .play(device_id, &uri, request.start_position_ms)
            .await?;

        let token = CancellationToken::new();
        {
            let mut slot = self.shared.slot();
            slot.loaded = Some(Loaded {
                uri: uri.clone(),
                generation,
            });
            slot.playing = true;
            if let Some(previous) = slot.poller.replace(token.clone()) {
                previous.cancel();
            }
        }

        self.shared.emit(generation, AdapterEventKind::Started);
        self.spawn_poller(uri, generation, token);
        Ok(())
    }

    fn spawn_poller(&self, uri: String, generation: u64, token: CancellationToken) {
        tokio::spawn(poll(
            Arc::clone(&self.shared),
            uri,
            generation,
            self.poll_interval,
            token,
        ));
    }

    fn stop_poller(&self) {
        if let Some(token) = self.shared.slot().poller.take() {
            token.cancel();
        }
    }

    fn require_device(&self) -> Result<String> {
        self.shared
            .slot()
            .device_id
            .clone()
            .ok_or(PlaybackError::NotReady(Provider::Spotify))
    }

    fn require_loaded(&self) -> Result<Loaded> {
        self.shared
            .slot()
            .loaded
            .clone()
            .ok_or_else(|| PlaybackError::transport(Provider::Spotify, "nothing loaded"))
    }
}

#[async_trait]
impl ProviderAdapter for SpotifyAdapter {
    fn provider(&self) -> Provider {
        Provider::Spotify
    }

    fn subscribe(&self, sink: AdapterEventSink) {
        *self
            .shared
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn is_ready(&self) -> bool {
        self.init.initialized()
    }

    async fn initialize(&self) -> Result<()> {
        self.init.get_or_try_init(|| self.handshake()).await?;
        Ok(())
    }

    async fn load_and_play(&self, request: LoadRequest) -> Result<()> {
        self.stop_poller();

        let device_id = {
            let mut slot = self.shared.slot();
            slot.pending_paused = false;
            if let Some(id) = slot.device_id.clone() {
                slot.pending = None;
                id
            } else {
                debug!(track = %request.track.key(), "Spotify device not ready, queueing load");
                slot.loaded = None;
                slot.pending = Some(request);
                return Ok(());
            }
        };

        self.start(&device_id, request).await
    }

    async fn pause(&self) -> Result<()> {
        self.stop_poller();

        let device_id = {
            let mut slot = self.shared.slot();
            if slot.pending.is_some() {
                debug!("Holding queued Spotify load until resumed");
                slot.pending_paused = true;
                return Ok(());
            }
            match slot.device_id.clone() {
                Some(id) if slot.playing && slot.loaded.is_some() => id,
                _ => return Ok(()),
            }
        };

        self.shared.api.pause(&device_id).await?;
        self.shared.slot().playing = false;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let device_id = self.require_device()?;

        let pending = {
            let mut slot = self.shared.slot();
            slot.pending_paused = false;
            slot.pending.take()
        };
        if let Some(request) = pending {
            debug!(track = %request.track.key(), "Starting held Spotify load");
            return self.start(&device_id, request).await;
        }

        let loaded = self.require_loaded()?;
        self.shared.api.resume(&device_id).await?;

        let token = CancellationToken::new();
        {
            let mut slot = self.shared.slot();
            slot.playing = true;
            if let Some(previous) = slot.poller.replace(token.clone()) {
                previous.cancel();
            }
        }
        self.spawn_poller(loaded.uri, loaded.generation, token);
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        {
            let mut slot = self.shared.slot();
            if let Some(request) = slot.pending.as_mut() {
                request.start_position_ms = position_ms;
                return Ok(());
            }
        }
        let device_id = self.require_device()?;
        self.require_loaded()?;
        self.shared.api.seek(&device_id, position_ms).await
    }

    async fn set_volume(&self, fraction: f32) -> Result<()> {
        let percent = to_percent(fraction);
        let device_id = {
            let mut slot = self.shared.slot();
            slot.volume_percent = Some(percent);
            slot.device_id.clone()
        };

        match device_id {
            Some(device_id) => self.shared.api.set_volume(&device_id, percent).await,
            None => {
                debug!(percent, "Spotify not ready, volume applied after handshake");
                Ok(())
            }
        }
    }
}

impl Drop for SpotifyAdapter {
    fn drop(&mut self) {
        self.stop_poller();
    }
}

impl std::fmt::Debug for SpotifyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyAdapter")
            .field("device_id", &self.device_id())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
