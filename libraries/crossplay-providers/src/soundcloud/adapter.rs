//! SoundCloud adapter over the embedded widget
//!
//! The widget pushes its own events, so there is no polling: a pump task
//! maps widget messages to adapter events stamped with the generation of the
//! most recent load.

use super::protocol::{WidgetCommand, WidgetMessage};
use super::transport::{WidgetChannel, WidgetTransport};
use async_trait::async_trait;
use crossplay_core::Provider;
use crossplay_playback::{
    clamp_fraction, AdapterEventKind, AdapterEventSink, LoadRequest, PlaybackError,
    ProviderAdapter, Result,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};

#[derive(Default)]
struct Shared {
    sink: Mutex<Option<AdapterEventSink>>,
    generation: AtomicU64,
    loaded: AtomicBool,
    // Set by a load until the widget plays the new source
    switching: AtomicBool,
}

impl Shared {
    fn emit(&self, generation: u64, kind: AdapterEventKind) {
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink.emit(generation, kind);
        }
    }

    /// Whether `kind` still belongs to the source being replaced
    ///
    /// The widget echoes the outgoing source's pause and progress after a
    /// new load has been sent. Only its first `play` (or an error) ends the
    /// switch.
    fn from_previous_source(&self, kind: &AdapterEventKind) -> bool {
        if !self.switching.load(Ordering::Acquire) {
            return false;
        }
        match kind {
            AdapterEventKind::Started => {
                self.switching.store(false, Ordering::Release);
                false
            }
            AdapterEventKind::Error { .. } => false,
            _ => true,
        }
    }

    /// Emit for the loaded track; widget chatter before the first load is dropped
    fn emit_loaded(&self, kind: AdapterEventKind) {
        if self.loaded.load(Ordering::Acquire) {
            self.emit(self.generation.load(Ordering::Acquire), kind);
        }
    }
}

fn widget_gone() -> PlaybackError {
    PlaybackError::transport(Provider::SoundCloud, "widget disconnected")
}

fn map_message(msg: WidgetMessage) -> Option<AdapterEventKind> {
    match msg {
        // Fired again on every source change
        WidgetMessage::Ready => None,
        WidgetMessage::Play => Some(AdapterEventKind::Started),
        WidgetMessage::PlayProgress {
            current_position, ..
        } => Some(AdapterEventKind::PositionTick {
            position_ms: current_position,
        }),
        WidgetMessage::Pause => Some(AdapterEventKind::Paused),
        WidgetMessage::Finish => Some(AdapterEventKind::Finished),
        WidgetMessage::Error { message } => Some(AdapterEventKind::Error { message }),
    }
}

async fn pump(shared: Arc<Shared>, mut messages: mpsc::Receiver<WidgetMessage>) {
    while let Some(msg) = messages.recv().await {
        let Some(kind) = map_message(msg) else {
            continue;
        };
        if shared.from_previous_source(&kind) {
            debug!(?kind, "Dropping widget event from the previous source");
            continue;
        }
        shared.emit_loaded(kind);
    }
    warn!("SoundCloud widget disconnected");
    shared.emit_loaded(AdapterEventKind::Error {
        message: widget_gone().to_string(),
    });
    shared.loaded.store(false, Ordering::Release);
}

/// SoundCloud provider adapter
pub struct SoundCloudAdapter {
    transport: Box<dyn WidgetTransport>,
    commands: OnceCell<mpsc::Sender<WidgetCommand>>,
    shared: Arc<Shared>,
}

impl SoundCloudAdapter {
    pub fn new(transport: Box<dyn WidgetTransport>) -> Self {
        Self {
            transport,
            commands: OnceCell::new(),
            shared: Arc::new(Shared::default()),
        }
    }

    async fn handshake(&self) -> Result<mpsc::Sender<WidgetCommand>> {
        let WidgetChannel {
            commands,
            mut messages,
        } = self.transport.connect().await?;

        commands
            .send(WidgetCommand::bind_all())
            .await
            .map_err(|_| widget_gone())?;

        loop {
            match messages.recv().await {
                Some(WidgetMessage::Ready) => break,
                Some(other) => debug!(?other, "Ignoring widget message before ready"),
                None => return Err(widget_gone()),
            }
        }

        info!("SoundCloud widget ready");
        self.shared.emit(0, AdapterEventKind::Ready { device_id: None });
        tokio::spawn(pump(Arc::clone(&self.shared), messages));
        Ok(commands)
    }

    async fn send(&self, command: WidgetCommand) -> Result<()> {
        let commands = self
            .commands
            .get()
            .ok_or(PlaybackError::NotReady(Provider::SoundCloud))?;
        commands.send(command).await.map_err(|_| widget_gone())
    }
}

#[async_trait]
impl ProviderAdapter for SoundCloudAdapter {
    fn provider(&self) -> Provider {
        Provider::SoundCloud
    }

    fn subscribe(&self, sink: AdapterEventSink) {
        *self
            .shared
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn is_ready(&self) -> bool {
        self.commands.initialized()
    }

    async fn initialize(&self) -> Result<()> {
        self.commands.get_or_try_init(|| self.handshake()).await?;
        Ok(())
    }

    async fn load_and_play(&self, request: LoadRequest) -> Result<()> {
        if !self.is_ready() {
            return Err(PlaybackError::NotReady(Provider::SoundCloud));
        }

        // Stamp before sending so the first events already carry the new generation
        self.shared.switching.store(true, Ordering::Release);
        self.shared
            .generation
            .store(request.generation, Ordering::Release);
        self.shared.loaded.store(true, Ordering::Release);

        debug!(track = %request.track.key(), generation = request.generation, "Loading widget source");
        self.send(WidgetCommand::Load {
            url: request.track.play_uri,
            auto_play: true,
        })
        .await?;

        if request.start_position_ms > 0 {
            self.send(WidgetCommand::SeekTo {
                milliseconds: request.start_position_ms,
            })
            .await?;
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        if !self.is_ready() || !self.shared.loaded.load(Ordering::Acquire) {
            return Ok(());
        }
        self.send(WidgetCommand::Pause).await
    }

    async fn resume(&self) -> Result<()> {
        self.send(WidgetCommand::Play).await
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        self.send(WidgetCommand::SeekTo {
            milliseconds: position_ms,
        })
        .await
    }

    async fn set_volume(&self, fraction: f32) -> Result<()> {
        if !self.is_ready() {
            debug!("SoundCloud not ready, skipping volume");
            return Ok(());
        }
        self.send(WidgetCommand::SetVolume {
            volume: clamp_fraction(fraction),
        })
        .await
    }
}

impl std::fmt::Debug for SoundCloudAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundCloudAdapter")
            .field("ready", &self.is_ready())
            .field("generation", &self.shared.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
