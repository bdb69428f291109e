//! Playback session controller
//!
//! Owns the queue and the session state machine, delegates transport calls to
//! the adapter matching the current track, and reacts to normalized adapter
//! events.
//!
//! ```text
//! Idle ──> Loading ──> Playing <──> Paused
//!            ^            │
//!            └─ Finished ─┴──> Idle (queue exhausted)
//! ```
//!
//! Every cursor change runs one transition: bump the generation, pause every
//! adapter, then load the new track on its provider's adapter. Adapter events
//! carry the generation of the load they serve; events from an older
//! generation or another provider are dropped.

use crate::adapter::{
    AdapterEvent, AdapterEventKind, AdapterEventSink, AdapterRegistry, LoadRequest, ProviderAdapter,
};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::queue::{CursorMove, Queue};
use crate::session::{SessionSnapshot, SessionStore};
use crate::types::{ControllerConfig, PlaybackStatus, SessionState};
use crate::volume::VolumeBridge;
use crossplay_core::{Provider, Track, VolumePersistence};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Commands accepted by a spawned controller
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Replace the queue with one track and play it
    PlayTrack(Track),
    /// Append a track; starts it when nothing was playing
    AddToQueue(Track),
    TogglePlayPause,
    PlayNext,
    PlayPrevious,
    /// Seek the current track (milliseconds)
    Seek(u64),
    SelectIndex(usize),
    RemoveTrack {
        id: String,
        provider: Provider,
    },
    Reorder {
        from: usize,
        to: usize,
    },
    Clear,
    /// Master volume fraction
    SetVolume(f32),
    /// Stop the controller task
    Shutdown,
}

/// Messages the controller posts to itself
#[derive(Debug)]
enum Internal {
    /// A track finished; move on if `generation` is still current
    Advance { generation: u64 },

    /// An adapter's initialization completed (or timed out)
    InitFinished {
        provider: Provider,
        result: Result<()>,
    },
}

/// Playback session controller
pub struct PlaybackController {
    config: ControllerConfig,
    registry: AdapterRegistry,
    store: Arc<dyn SessionStore>,
    volume: VolumeBridge,

    queue: Queue,
    status: PlaybackStatus,
    position_ms: u64,
    is_seeking: bool,
    active_provider: Option<Provider>,
    generation: u64,

    // Current track is selected but nothing is loaded on its adapter
    needs_load: bool,
    // Restored from a snapshot and not started yet
    pending_restore: bool,
    unavailable: BTreeSet<Provider>,

    adapter_rx: mpsc::UnboundedReceiver<AdapterEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,

    pending_events: Vec<PlaybackEvent>,
    state_tx: watch::Sender<SessionState>,
    last_saved: Option<SessionSnapshot>,
}

impl PlaybackController {
    /// Create a controller and subscribe every registered adapter
    pub fn new(
        config: ControllerConfig,
        registry: AdapterRegistry,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let (adapter_tx, adapter_rx) = mpsc::unbounded_channel();
        for adapter in registry.iter() {
            adapter.subscribe(AdapterEventSink::new(adapter.provider(), adapter_tx.clone()));
        }

        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let volume = VolumeBridge::new(config.initial_volume);
        let (state_tx, _) = watch::channel(SessionState {
            volume: volume.volume(),
            ..SessionState::default()
        });

        Self {
            config,
            registry,
            store,
            volume,
            queue: Queue::new(),
            status: PlaybackStatus::Idle,
            position_ms: 0,
            is_seeking: false,
            active_provider: None,
            generation: 0,
            needs_load: false,
            pending_restore: false,
            unavailable: BTreeSet::new(),
            adapter_rx,
            internal_tx,
            internal_rx,
            pending_events: Vec::new(),
            state_tx,
            last_saved: None,
        }
    }

    /// Persist master volume for authenticated users
    #[must_use]
    pub fn with_volume_persistence(mut self, persistence: Arc<dyn VolumePersistence>) -> Self {
        self.volume = VolumeBridge::new(self.volume.volume()).with_persistence(persistence);
        self
    }

    // ===== Startup =====

    /// Restore the last saved session
    ///
    /// Call before initializing adapters. Missing, unreadable or inconsistent
    /// snapshots leave the controller `Idle` with an empty queue. A valid
    /// snapshot restores queue, cursor and position in `Paused`. Returns
    /// whether anything was restored.
    pub async fn restore(&mut self) -> bool {
        let snapshot = match self.store.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No saved session");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session");
                self.discard_session().await;
                return false;
            }
        };

        let Some((queue, position_ms)) = snapshot.clone().into_queue() else {
            warn!("Discarding inconsistent session");
            self.discard_session().await;
            return false;
        };
        if queue.is_empty() {
            return false;
        }

        self.queue = queue;
        self.position_ms = position_ms;
        self.active_provider = self.queue.current().map(|t| t.provider);
        self.needs_load = true;
        self.pending_restore = true;
        self.last_saved = Some(snapshot);

        info!(
            tracks = self.queue.len(),
            index = ?self.queue.current_index(),
            position_ms,
            "Session restored"
        );

        self.emit_queue_changed();
        self.emit_track_changed(None);
        self.set_status(PlaybackStatus::Paused);
        self.publish_state();
        true
    }

    async fn discard_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to remove session");
        }
    }

    /// Initialize every adapter and wait until all have succeeded, failed or
    /// timed out
    ///
    /// [`spawn`](Self::spawn) does the same in the background.
    pub async fn initialize_providers(&mut self) {
        let mut remaining = self.spawn_initializers();
        while remaining > 0 {
            let Some(message) = self.internal_rx.recv().await else {
                break;
            };
            if matches!(message, Internal::InitFinished { .. }) {
                remaining -= 1;
            }
            self.handle_internal(message).await;
        }
        self.commit().await;
    }

    fn spawn_initializers(&self) -> usize {
        let mut count = 0;
        for adapter in self.registry.iter() {
            let adapter = Arc::clone(adapter);
            let tx = self.internal_tx.clone();
            let ready_timeout = self.config.ready_timeout;

            tokio::spawn(async move {
                let provider = adapter.provider();
                let result = match tokio::time::timeout(ready_timeout, adapter.initialize()).await {
                    Ok(result) => result,
                    Err(_) => Err(PlaybackError::Timeout(provider)),
                };
                let _ = tx.send(Internal::InitFinished { provider, result });
            });
            count += 1;
        }
        count
    }

    async fn on_initialized(&mut self, provider: Provider, result: Result<()>) {
        match result {
            Ok(()) => {
                info!(%provider, "Provider initialized");
                self.unavailable.remove(&provider);

                if let Some(adapter) = self.registry.get(provider) {
                    if let Err(e) = adapter.set_volume(self.volume.volume()).await {
                        warn!(%provider, error = %e, "Failed to apply initial volume");
                    }
                }

                let owns_current = self.queue.current().is_some_and(|t| t.provider == provider);
                if self.config.resume_on_ready && self.pending_restore && owns_current {
                    info!(%provider, position_ms = self.position_ms, "Resuming restored track");
                    self.start_current(self.position_ms).await;
                }
            }
            Err(e) => {
                error!(%provider, error = %e, "Provider unavailable for this session");
                self.unavailable.insert(provider);
                self.pending_events.push(PlaybackEvent::ProviderUnavailable {
                    provider,
                    message: e.to_string(),
                });

                // A load may have been accepted before the handshake failed
                let owns_current = self.queue.current().is_some_and(|t| t.provider == provider);
                if owns_current && matches!(self.status, PlaybackStatus::Loading | PlaybackStatus::Playing) {
                    self.mark_unplayable(PlaybackError::ProviderUnavailable(provider));
                }
            }
        }
    }

    // ===== Transport =====

    /// Replace the queue with `track` and play it
    pub async fn play_track(&mut self, track: Track) {
        let previous = self.queue.current().cloned();
        self.queue.replace_with(track);
        self.emit_queue_changed();
        self.emit_track_changed(previous);
        self.start_current(0).await;
        self.commit().await;
    }

    /// Append `track`; when the controller was idle, the new track starts
    pub async fn add_to_queue(&mut self, track: Track) {
        let was_idle = self.status == PlaybackStatus::Idle;
        let previous = self.queue.current().cloned();

        let moved = match self.queue.enqueue(track) {
            CursorMove::Moved => true,
            // Queue was exhausted; the appended track becomes current
            _ if was_idle => self.queue.select_index(self.queue.len() - 1),
            _ => false,
        };
        self.emit_queue_changed();

        if moved {
            self.emit_track_changed(previous);
            self.start_current(0).await;
        }
        self.commit().await;
    }

    /// Pause or resume the current track; a no-op while idle
    pub async fn toggle_play_pause(&mut self) {
        match self.status {
            PlaybackStatus::Idle => debug!("Toggle ignored while idle"),
            PlaybackStatus::Playing | PlaybackStatus::Loading => {
                if let Some(adapter) = self.current_adapter() {
                    match adapter.pause().await {
                        Ok(()) => self.set_status(PlaybackStatus::Paused),
                        Err(e) => self.report(&e),
                    }
                }
            }
            PlaybackStatus::Paused if self.needs_load => {
                self.start_current(self.position_ms).await;
            }
            PlaybackStatus::Paused => {
                if let Some(adapter) = self.current_adapter() {
                    match adapter.resume().await {
                        Ok(()) => self.set_status(PlaybackStatus::Playing),
                        Err(e) => self.report(&e),
                    }
                }
            }
        }
        self.commit().await;
    }

    /// Move to the next track; at the end of the queue nothing happens
    pub async fn play_next(&mut self) {
        let previous = self.queue.current().cloned();
        if self.queue.advance() {
            self.emit_track_changed(previous);
            self.start_current(0).await;
            self.commit().await;
        } else {
            info!(index = ?self.queue.current_index(), "Already at the end of the queue");
        }
    }

    /// Move to the previous track; at the first track, restart it instead
    pub async fn play_previous(&mut self) {
        let previous = self.queue.current().cloned();
        if self.queue.retreat() {
            self.emit_track_changed(previous);
            self.start_current(0).await;
            self.commit().await;
        } else if previous.is_some() {
            debug!("At the first track, restarting");
            self.seek(0).await;
        }
    }

    /// Seek the current track
    ///
    /// Position ticks arriving while the adapter handles the seek are
    /// ignored so they cannot overwrite the requested position.
    pub async fn seek(&mut self, position_ms: u64) {
        let Some(track) = self.queue.current() else {
            return;
        };
        let position_ms = if track.duration_ms > 0 {
            position_ms.min(track.duration_ms)
        } else {
            position_ms
        };

        // Nothing loaded yet; the position is used by the next load
        if self.needs_load || self.status == PlaybackStatus::Idle {
            self.position_ms = position_ms;
            self.emit_position();
            self.commit().await;
            return;
        }

        let Some(adapter) = self.current_adapter() else {
            return;
        };

        self.is_seeking = true;
        self.publish_state();

        match adapter.seek(position_ms).await {
            Ok(()) => {
                self.position_ms = position_ms;
                self.emit_position();
            }
            Err(e) => self.report(&e),
        }

        // Flush whatever the adapter posted during the round-trip
        while let Ok(event) = self.adapter_rx.try_recv() {
            self.handle_adapter_event(event);
        }
        self.is_seeking = false;
        self.commit().await;
    }

    // ===== Queue =====

    /// Select the track at `index` and play it; out of range is ignored
    pub async fn select_index(&mut self, index: usize) {
        let previous = self.queue.current().cloned();
        if self.queue.select_index(index) {
            self.emit_track_changed(previous);
            self.start_current(0).await;
            self.commit().await;
        } else {
            debug!(index, len = self.queue.len(), "Select out of range ignored");
        }
    }

    /// Remove the first entry matching `(id, provider)`
    ///
    /// Removing the current track plays whichever track takes its place;
    /// removing the last remaining track stops playback.
    pub async fn remove_track(&mut self, id: &str, provider: Provider) {
        let previous = self.queue.current().cloned();
        let Some((removed, effect)) = self.queue.remove_track(id, provider) else {
            debug!(id, %provider, "Remove matched nothing");
            return;
        };
        debug!(track = %removed.key(), "Removed from queue");
        self.emit_queue_changed();

        match effect {
            CursorMove::Unchanged => {}
            CursorMove::Moved => {
                self.emit_track_changed(previous);
                self.start_current(0).await;
            }
            CursorMove::Cleared => self.stop().await,
        }
        self.commit().await;
    }

    /// Move one queue entry; the current track keeps playing
    pub async fn reorder(&mut self, from: usize, to: usize) {
        if self.queue.reorder(from, to) {
            self.emit_queue_changed();
            self.commit().await;
        } else {
            debug!(from, to, len = self.queue.len(), "Reorder out of range ignored");
        }
    }

    /// Empty the queue and stop every adapter
    pub async fn clear(&mut self) {
        self.queue.clear();
        self.emit_queue_changed();
        self.stop().await;
        self.commit().await;
    }

    // ===== Volume =====

    /// Set master volume on every adapter and persist it when authenticated
    ///
    /// Returns the handle of the background persistence task, if one was
    /// started.
    pub async fn set_volume(&mut self, fraction: f32) -> Option<JoinHandle<()>> {
        let handle = self.volume.set_volume(fraction, &self.registry).await;
        self.pending_events.push(PlaybackEvent::VolumeChanged {
            volume: self.volume.volume(),
        });
        self.commit().await;
        handle
    }

    // ===== Event processing =====

    /// Apply one adapter event
    ///
    /// Never calls back into an adapter; a finished track is turned into an
    /// internal advance message handled on a later turn.
    pub fn handle_adapter_event(&mut self, event: AdapterEvent) {
        let AdapterEvent {
            provider,
            generation,
            kind,
        } = event;

        let is_ready = matches!(kind, AdapterEventKind::Ready { .. });
        if !is_ready && (self.active_provider != Some(provider) || generation != self.generation) {
            debug!(
                %provider,
                generation,
                current = self.generation,
                "Dropping stale adapter event"
            );
            return;
        }

        match kind {
            AdapterEventKind::Ready { device_id } => {
                info!(%provider, ?device_id, "Provider ready");
                self.pending_events.push(PlaybackEvent::ProviderReady { provider, device_id });
            }
            AdapterEventKind::Started => {
                // Vendor resumed on its own counts too
                let resumed = self.status == PlaybackStatus::Paused && !self.needs_load;
                if self.status == PlaybackStatus::Loading || resumed {
                    self.set_status(PlaybackStatus::Playing);
                }
            }
            AdapterEventKind::PositionTick { position_ms } => {
                if self.is_seeking {
                    return;
                }
                let duration_ms = self.queue.current().map_or(0, |t| t.duration_ms);
                self.position_ms = if duration_ms > 0 {
                    position_ms.min(duration_ms)
                } else {
                    position_ms
                };
                self.emit_position();
                if self.status == PlaybackStatus::Loading {
                    self.set_status(PlaybackStatus::Playing);
                }
            }
            AdapterEventKind::Paused => {
                if matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Loading) {
                    self.set_status(PlaybackStatus::Paused);
                }
            }
            AdapterEventKind::Finished => {
                debug!(%provider, generation, "Track finished");
                let _ = self.internal_tx.send(Internal::Advance { generation });
            }
            AdapterEventKind::Error { message } => {
                warn!(%provider, %message, "Adapter reported an error");
                if self.status == PlaybackStatus::Loading {
                    self.needs_load = true;
                }
                if self.status != PlaybackStatus::Idle {
                    self.set_status(PlaybackStatus::Paused);
                }
                self.report(&PlaybackError::transport(provider, message));
            }
        }
    }

    async fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Advance { generation } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Dropping stale advance");
                    return;
                }
                let previous = self.queue.current().cloned();
                if self.queue.advance() {
                    self.emit_track_changed(previous);
                    self.start_current(0).await;
                } else {
                    info!("Queue finished");
                    self.generation += 1;
                    self.go_idle();
                    self.pending_events.push(PlaybackEvent::QueueFinished);
                }
            }
            Internal::InitFinished { provider, result } => {
                self.on_initialized(provider, result).await;
            }
        }
    }

    async fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::PlayTrack(track) => self.play_track(track).await,
            PlayerCommand::AddToQueue(track) => self.add_to_queue(track).await,
            PlayerCommand::TogglePlayPause => self.toggle_play_pause().await,
            PlayerCommand::PlayNext => self.play_next().await,
            PlayerCommand::PlayPrevious => self.play_previous().await,
            PlayerCommand::Seek(position_ms) => self.seek(position_ms).await,
            PlayerCommand::SelectIndex(index) => self.select_index(index).await,
            PlayerCommand::RemoveTrack { id, provider } => self.remove_track(&id, provider).await,
            PlayerCommand::Reorder { from, to } => self.reorder(from, to).await,
            PlayerCommand::Clear => self.clear().await,
            PlayerCommand::SetVolume(fraction) => {
                self.set_volume(fraction).await;
            }
            PlayerCommand::Shutdown => {}
        }
    }

    /// Handle every queued adapter event and internal message
    ///
    /// Loops until both queues are empty, so an advance posted by a finished
    /// track is processed too.
    pub async fn process_pending(&mut self) {
        loop {
            if let Ok(event) = self.adapter_rx.try_recv() {
                self.handle_adapter_event(event);
                continue;
            }
            if let Ok(message) = self.internal_rx.try_recv() {
                self.handle_internal(message).await;
                continue;
            }
            break;
        }
        self.commit().await;
    }

    /// Drain events queued since the last call
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        SessionState {
            status: self.status,
            current_track: self.queue.current().cloned(),
            current_index: self.queue.current_index(),
            queue: self.queue.tracks().to_vec(),
            is_playing: self.status == PlaybackStatus::Playing,
            position_ms: self.position_ms,
            active_provider: self.active_provider,
            is_seeking: self.is_seeking,
            volume: self.volume.volume(),
        }
    }

    /// Subscribe to state snapshots
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Current transition token
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Providers that failed to initialize
    pub fn unavailable_providers(&self) -> Vec<Provider> {
        self.unavailable.iter().copied().collect()
    }

    // ===== Task =====

    /// Run the controller on its own task
    ///
    /// Adapter initialization starts in the background; call
    /// [`restore`](Self::restore) first if a saved session should be picked up.
    pub fn spawn(self) -> PlayerHandle {
        let (commands, command_rx) = mpsc::channel(self.config.command_capacity);
        let (events, _) = broadcast::channel(self.config.event_capacity);
        let state = self.state_tx.subscribe();

        let task = tokio::spawn(self.run(command_rx, events.clone()));

        PlayerHandle {
            commands,
            state,
            events,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<PlayerCommand>,
        events: broadcast::Sender<PlaybackEvent>,
    ) {
        info!(providers = ?self.registry.providers(), "Playback controller started");
        self.spawn_initializers();
        self.flush_events(&events);

        loop {
            tokio::select! {
                biased;

                Some(message) = self.internal_rx.recv() => {
                    self.handle_internal(message).await;
                }
                Some(event) = self.adapter_rx.recv() => {
                    self.handle_adapter_event(event);
                }
                command = commands.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => {
                        debug!(?command, "Player command");
                        self.handle_command(command).await;
                    }
                },
            }

            self.commit().await;
            self.flush_events(&events);
        }

        self.pause_all().await;
        self.commit().await;
        info!("Playback controller stopped");
    }

    fn flush_events(&mut self, events: &broadcast::Sender<PlaybackEvent>) {
        for event in self.drain_events() {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }

    // ===== Internals =====

    /// Run one transition to the current track
    async fn start_current(&mut self, start_position_ms: u64) {
        let Some(track) = self.queue.current().cloned() else {
            self.go_idle();
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        self.position_ms = start_position_ms;
        self.is_seeking = false;
        self.active_provider = Some(track.provider);
        self.pending_restore = false;

        // Pause before load, on every adapter
        self.pause_all().await;

        if self.unavailable.contains(&track.provider) {
            self.mark_unplayable(PlaybackError::ProviderUnavailable(track.provider));
            return;
        }
        let Some(adapter) = self.registry.get(track.provider).cloned() else {
            self.mark_unplayable(PlaybackError::NoAdapter(track.provider));
            return;
        };

        debug!(track = %track.key(), generation, start_position_ms, "Loading track");
        self.set_status(PlaybackStatus::Loading);

        let request = LoadRequest {
            track,
            start_position_ms,
            generation,
        };
        match adapter.load_and_play(request).await {
            Ok(()) => self.needs_load = false,
            Err(e) => {
                self.needs_load = true;
                self.set_status(PlaybackStatus::Paused);
                self.report(&e);
            }
        }
    }

    async fn pause_all(&self) {
        for adapter in self.registry.iter() {
            if let Err(e) = adapter.pause().await {
                debug!(provider = %adapter.provider(), error = %e, "Pause failed");
            }
        }
    }

    async fn stop(&mut self) {
        self.generation += 1;
        self.pause_all().await;
        self.go_idle();
    }

    fn go_idle(&mut self) {
        self.position_ms = 0;
        self.is_seeking = false;
        self.active_provider = None;
        self.needs_load = false;
        self.pending_restore = false;
        self.set_status(PlaybackStatus::Idle);
    }

    fn mark_unplayable(&mut self, error: PlaybackError) {
        warn!(error = %error, "Current track cannot be played");
        self.needs_load = true;
        self.set_status(PlaybackStatus::Paused);
        if let Some(track) = self.queue.current().cloned() {
            self.pending_events.push(PlaybackEvent::TrackUnplayable { track });
        }
        self.report(&error);
    }

    fn current_adapter(&self) -> Option<Arc<dyn ProviderAdapter>> {
        let provider = self.queue.current()?.provider;
        self.registry.get(provider).cloned()
    }

    fn report(&mut self, error: &PlaybackError) {
        warn!(error = %error, "Playback error");
        self.pending_events.push(PlaybackEvent::Error {
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.status != status {
            debug!(from = ?self.status, to = ?status, "Status changed");
            self.status = status;
            self.pending_events.push(PlaybackEvent::StateChanged { status });
        }
    }

    fn emit_track_changed(&mut self, previous: Option<Track>) {
        if let (Some(track), Some(index)) = (self.queue.current().cloned(), self.queue.current_index()) {
            self.pending_events.push(PlaybackEvent::TrackChanged {
                track,
                index,
                previous,
            });
        }
    }

    fn emit_queue_changed(&mut self) {
        self.pending_events.push(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });
    }

    fn emit_position(&mut self) {
        let duration_ms = self.queue.current().map_or(0, |t| t.duration_ms);
        self.pending_events.push(PlaybackEvent::PositionUpdate {
            position_ms: self.position_ms,
            duration_ms,
        });
    }

    fn publish_state(&self) {
        let state = self.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    /// Publish state and mirror it to the session store
    async fn commit(&mut self) {
        self.publish_state();

        let snapshot = SessionSnapshot::capture(&self.queue, self.position_ms);
        if self
            .last_saved
            .as_ref()
            .is_some_and(|saved| saved.same_context(&snapshot))
        {
            return;
        }
        match self.store.save(&snapshot).await {
            Ok(()) => self.last_saved = Some(snapshot),
            Err(e) => warn!(error = %e, "Failed to save session"),
        }
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("status", &self.status)
            .field("queue_len", &self.queue.len())
            .field("current_index", &self.queue.current_index())
            .field("generation", &self.generation)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Handle to a spawned controller
#[derive(Debug)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    state: watch::Receiver<SessionState>,
    events: broadcast::Sender<PlaybackEvent>,
    task: JoinHandle<()>,
}

impl PlayerHandle {
    /// Send a command to the controller
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::ControllerStopped)
    }

    /// Clone of the command sender
    pub fn commands(&self) -> mpsc::Sender<PlayerCommand> {
        self.commands.clone()
    }

    /// Latest published state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch state snapshots
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Subscribe to playback events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Stop the controller and wait for its task to end
    pub async fn shutdown(self) -> Result<()> {
        // The task may already be gone
        let _ = self.commands.send(PlayerCommand::Shutdown).await;
        self.task.await.map_err(|_| PlaybackError::ControllerStopped)
    }
}
