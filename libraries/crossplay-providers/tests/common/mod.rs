//! Common test utilities: token stubs and event capture
#![allow(dead_code)]

use async_trait::async_trait;
use crossplay_core::{CoreError, Provider, Track};
use crossplay_playback::{AdapterEvent, AdapterEventKind, AdapterEventSink, LoadRequest, ProviderAdapter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Hands out a fixed token for every provider
pub struct StaticTokens(pub &'static str);

#[async_trait]
impl crossplay_core::TokenProvider for StaticTokens {
    async fn get_access_token(&self, _provider: Provider) -> crossplay_core::Result<String> {
        Ok(self.0.to_string())
    }
}

/// Token broker that always refuses
pub struct RejectingTokens;

#[async_trait]
impl crossplay_core::TokenProvider for RejectingTokens {
    async fn get_access_token(&self, provider: Provider) -> crossplay_core::Result<String> {
        Err(CoreError::token(provider, "session expired"))
    }
}

/// Fixed token that counts how often the vendor rejected it
#[derive(Default)]
pub struct CountingTokens {
    pub invalidated: AtomicUsize,
}

#[async_trait]
impl crossplay_core::TokenProvider for CountingTokens {
    async fn get_access_token(&self, _provider: Provider) -> crossplay_core::Result<String> {
        Ok("spotify-token".to_string())
    }

    async fn invalidate_access_token(&self, _provider: Provider) {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn tokens() -> Arc<dyn crossplay_core::TokenProvider> {
    Arc::new(StaticTokens("spotify-token"))
}

/// Subscribe `adapter` to a fresh channel and return its receiving end
pub fn capture(adapter: &dyn ProviderAdapter) -> mpsc::UnboundedReceiver<AdapterEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    adapter.subscribe(AdapterEventSink::new(adapter.provider(), tx));
    rx
}

/// Next event, failing the test after two seconds
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<AdapterEvent>) -> AdapterEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for adapter event")
        .expect("event channel closed")
}

/// Skip events until one matches `pred`
pub async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<AdapterEvent>,
    pred: impl Fn(&AdapterEventKind) -> bool,
) -> AdapterEvent {
    loop {
        let event = next_event(rx).await;
        if pred(&event.kind) {
            return event;
        }
    }
}

pub fn spotify_track(id: &str) -> Track {
    Track::new(id, Provider::Spotify, format!("spotify:track:{id}"), format!("Spotify {id}"), 200_000)
}

pub fn soundcloud_track(id: &str) -> Track {
    Track::new(
        id,
        Provider::SoundCloud,
        format!("https://api.soundcloud.com/tracks/{id}"),
        format!("SoundCloud {id}"),
        150_000,
    )
}

pub fn load(track: Track, start_position_ms: u64, generation: u64) -> LoadRequest {
    LoadRequest {
        track,
        start_position_ms,
        generation,
    }
}

/// Drain whatever is already queued without waiting
pub fn drain(rx: &mut mpsc::UnboundedReceiver<AdapterEvent>) -> Vec<AdapterEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
