//! Wiring: configuration in, running player out

use crate::bridge;
use crate::config::{AppConfig, BridgeKind};
use crate::console::{self, ConsoleCommand};
use crate::error::Result;
use crossplay_backend_client::BackendClient;
use crossplay_core::TokenProvider;
use crossplay_playback::{AdapterRegistry, JsonFileStore, PlaybackController, PlayerHandle};
use crossplay_providers::soundcloud::{
    HandoffTransport, SoundCloudAdapter, TcpWidgetTransport, WidgetChannel, WidgetTransport,
};
use crossplay_providers::spotify::{
    DeviceConnector, FixedDeviceConnector, NamedDeviceConnector, SpotifyAdapter, WebApiClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

/// Adapters for every enabled provider
///
/// With the websocket bridge, the returned sender must be handed to
/// [`bridge::serve`] so the SoundCloud adapter can receive its page.
pub fn build_registry(
    config: &AppConfig,
    tokens: Arc<dyn TokenProvider>,
) -> Result<(AdapterRegistry, Option<mpsc::Sender<WidgetChannel>>)> {
    let mut registry = AdapterRegistry::new();
    let mut handoff = None;

    if config.spotify.enabled {
        let api = WebApiClient::new(&config.spotify.api_base, Arc::clone(&tokens))?;
        let connector: Box<dyn DeviceConnector> = match &config.spotify.device_id {
            Some(id) => Box::new(FixedDeviceConnector::new(id.clone())),
            None => Box::new(NamedDeviceConnector::new(
                config.spotify.device_name.clone(),
                Duration::from_millis(config.spotify.device_poll_ms),
            )),
        };
        let adapter = SpotifyAdapter::new(api, connector)
            .with_poll_interval(Duration::from_millis(config.spotify.poll_interval_ms));
        registry.register(Arc::new(adapter));
    }

    if config.soundcloud.enabled {
        let transport: Box<dyn WidgetTransport> = match config.soundcloud.bridge {
            BridgeKind::Ws => {
                let (transport, tx) = HandoffTransport::new();
                handoff = Some(tx);
                Box::new(transport)
            }
            BridgeKind::Tcp => Box::new(TcpWidgetTransport::new(config.soundcloud.bridge_addr)),
        };
        registry.register(Arc::new(SoundCloudAdapter::new(transport)));
    }

    Ok((registry, handoff))
}

/// Build, restore and spawn the player
pub async fn start(config: &AppConfig) -> Result<PlayerHandle> {
    let backend = Arc::new(BackendClient::new(config.backend_config())?);
    if !backend.has_session() {
        warn!("No session token configured, provider tokens will be unavailable");
    }

    let (registry, handoff) = build_registry(config, Arc::clone(&backend) as Arc<dyn TokenProvider>)?;

    if let Some(tx) = handoff {
        let addr = config.soundcloud.bridge_addr;
        tokio::spawn(async move {
            if let Err(e) = bridge::serve(addr, tx).await {
                error!(error = %e, "Widget bridge stopped");
            }
        });
    }

    let session_path = config.session_path();
    info!(path = %session_path.display(), "Session file");
    let mut controller = PlaybackController::new(
        config.controller_config(),
        registry,
        Arc::new(JsonFileStore::new(session_path)),
    )
    .with_volume_persistence(backend);

    if controller.restore().await {
        info!("Restored previous session");
    }
    Ok(controller.spawn())
}

/// Print notable events until the player stops
fn spawn_event_printer(mut events: broadcast::Receiver<crossplay_playback::PlaybackEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = console::format_event(&event) {
                        println!("{line}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Run the console until `quit`, end of input or Ctrl-C
pub async fn run(config: &AppConfig) -> Result<()> {
    let player = start(config).await?;
    spawn_event_printer(player.subscribe());
    println!("{}", console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        match console::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Player(command))) => player.send(command).await?,
            Ok(Some(ConsoleCommand::Status)) => println!("{}", console::format_status(&player.state())),
            Ok(Some(ConsoleCommand::Help)) => println!("{}", console::HELP),
            Ok(Some(ConsoleCommand::Quit)) => break,
            Err(e) => println!("{e}"),
        }
    }

    info!("Shutting down");
    player.shutdown().await?;
    Ok(())
}
