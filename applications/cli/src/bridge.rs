//! Widget bridge host
//!
//! Serves the page embedding the SoundCloud widget and relays its websocket
//! to the SoundCloud adapter. Only the first page to connect is handed to
//! the adapter.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use crossplay_providers::soundcloud::{WidgetChannel, WidgetEndpoint, WidgetMessage};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{debug, info, warn};

const HOST_PAGE: &str = include_str!("../assets/widget.html");

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
struct BridgeState {
    handoff: mpsc::Sender<WidgetChannel>,
    attached: Arc<AtomicBool>,
}

impl BridgeState {
    fn new(handoff: mpsc::Sender<WidgetChannel>) -> Self {
        Self {
            handoff,
            attached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Hand a fresh channel to the adapter; only the first page gets one
    fn claim(&self) -> Result<WidgetEndpoint, (StatusCode, &'static str)> {
        if self.attached.swap(true, Ordering::AcqRel) {
            return Err((StatusCode::CONFLICT, "a widget page is already connected"));
        }
        let (channel, endpoint) = WidgetChannel::pair(CHANNEL_CAPACITY);
        if self.handoff.try_send(channel).is_err() {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "SoundCloud is no longer waiting for a page",
            ));
        }
        Ok(endpoint)
    }
}

/// Router serving the host page (`/`) and the widget socket (`/bridge`)
pub fn router(handoff: mpsc::Sender<WidgetChannel>) -> Router {
    Router::new()
        .route("/", get(host_page))
        .route("/bridge", get(bridge))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(BridgeState::new(handoff))
}

/// Serve the bridge until the listener fails
pub async fn serve(addr: SocketAddr, handoff: mpsc::Sender<WidgetChannel>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Open http://{} to connect SoundCloud", listener.local_addr()?);
    axum::serve(listener, router(handoff)).await
}

async fn host_page() -> Html<&'static str> {
    Html(HOST_PAGE)
}

async fn bridge(ws: WebSocketUpgrade, State(state): State<BridgeState>) -> Response {
    match state.claim() {
        Ok(endpoint) => ws.on_upgrade(move |socket| relay(socket, endpoint)),
        Err((status, reason)) => {
            warn!(%status, reason, "Rejecting widget page");
            (status, reason).into_response()
        }
    }
}

async fn relay(socket: WebSocket, endpoint: WidgetEndpoint) {
    let WidgetEndpoint {
        mut commands,
        messages,
    } = endpoint;
    let (mut sink, mut stream) = socket.split();
    info!("Widget page connected");

    let outbound = async move {
        while let Some(command) = commands.recv().await {
            let text = match serde_json::to_string(&command) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode widget command");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    };

    let inbound = async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<WidgetMessage>(&text) {
                    Ok(msg) => {
                        if messages.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Skipping malformed widget message"),
                },
                Message::Close(_) => break,
                other => debug!(?other, "Ignoring websocket frame"),
            }
        }
    };

    tokio::select! {
        () = outbound => {}
        () = inbound => {}
    }
    info!("Widget page disconnected");
}
