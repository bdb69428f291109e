//! Transports between the adapter and the widget page
//!
//! A [`WidgetChannel`] is the adapter's side of one connected page: commands
//! go out, widget messages come in. How the page is reached (a websocket
//! served by the application, a raw TCP socket) is the transport's concern.

use super::protocol::{WidgetCommand, WidgetMessage};
use async_trait::async_trait;
use crossplay_core::Provider;
use crossplay_playback::{PlaybackError, Result};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Adapter side of a connected widget page
#[derive(Debug)]
pub struct WidgetChannel {
    pub commands: mpsc::Sender<WidgetCommand>,
    pub messages: mpsc::Receiver<WidgetMessage>,
}

/// Page side of a [`WidgetChannel`]
#[derive(Debug)]
pub struct WidgetEndpoint {
    pub commands: mpsc::Receiver<WidgetCommand>,
    pub messages: mpsc::Sender<WidgetMessage>,
}

impl WidgetChannel {
    /// Create a connected channel/endpoint pair
    pub fn pair(capacity: usize) -> (WidgetChannel, WidgetEndpoint) {
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (message_tx, message_rx) = mpsc::channel(capacity);
        (
            WidgetChannel {
                commands: command_tx,
                messages: message_rx,
            },
            WidgetEndpoint {
                commands: command_rx,
                messages: message_tx,
            },
        )
    }
}

/// Produces a channel to a live widget page
#[async_trait]
pub trait WidgetTransport: Send + Sync {
    /// Wait for a page to connect
    async fn connect(&self) -> Result<WidgetChannel>;
}

fn bridge_error(msg: impl Into<String>) -> PlaybackError {
    PlaybackError::transport(Provider::SoundCloud, msg)
}

/// Newline-delimited JSON over any byte stream
pub struct JsonLinesWidget;

impl JsonLinesWidget {
    const CAPACITY: usize = 64;

    /// Drive `stream` with reader and writer tasks
    ///
    /// Lines that do not parse as a widget message are logged and skipped.
    /// The channel closes when the peer disconnects.
    pub fn spawn<S>(stream: S) -> WidgetChannel
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (
            channel,
            WidgetEndpoint {
                mut commands,
                messages,
            },
        ) = WidgetChannel::pair(Self::CAPACITY);
        let (read_half, mut write_half) = tokio::io::split(stream);

        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match serde_json::from_str::<WidgetMessage>(&line) {
                        Ok(msg) => {
                            if messages.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Skipping malformed widget message"),
                    },
                    Ok(None) => {
                        debug!("Widget peer closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Widget read failed");
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                let mut line = match serde_json::to_string(&command) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode widget command");
                        continue;
                    }
                };
                line.push('\n');
                if let Err(e) = write_half.write_all(line.as_bytes()).await {
                    warn!(error = %e, "Widget write failed");
                    break;
                }
            }
        });

        channel
    }
}

/// Listens on a TCP address and accepts one page per `connect`
#[derive(Debug, Clone)]
pub struct TcpWidgetTransport {
    addr: SocketAddr,
}

impl TcpWidgetTransport {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl WidgetTransport for TcpWidgetTransport {
    async fn connect(&self) -> Result<WidgetChannel> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Waiting for SoundCloud widget page");

        let (stream, peer) = listener.accept().await?;
        info!(%peer, "SoundCloud widget page connected");
        Ok(JsonLinesWidget::spawn(stream))
    }
}

/// Receives channels built elsewhere (e.g. by a websocket handler)
#[derive(Debug)]
pub struct HandoffTransport {
    incoming: Mutex<mpsc::Receiver<WidgetChannel>>,
}

impl HandoffTransport {
    /// Create the transport and the sender that hands channels to it
    pub fn new() -> (Self, mpsc::Sender<WidgetChannel>) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                incoming: Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl WidgetTransport for HandoffTransport {
    async fn connect(&self) -> Result<WidgetChannel> {
        self.incoming
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| bridge_error("widget bridge closed"))
    }
}
