//! Spotify adapter tests against a mocked Web API

mod common;

use common::{
    capture, drain, load, next_event, spotify_track, tokens, wait_for, CountingTokens,
    RejectingTokens,
};
use crossplay_core::Provider;
use crossplay_playback::{
    AdapterEventKind, AdapterRegistry, ControllerConfig, MemoryStore, PlaybackController,
    PlaybackError, PlaybackEvent, PlaybackStatus, ProviderAdapter,
};
use crossplay_providers::spotify::{
    FixedDeviceConnector, NamedDeviceConnector, SpotifyAdapter, WebApiClient,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter_for(server: &MockServer) -> SpotifyAdapter {
    let api = WebApiClient::new(server.uri(), tokens()).unwrap();
    SpotifyAdapter::new(api, Box::new(FixedDeviceConnector::new("dev-1")))
        .with_poll_interval(Duration::from_millis(20))
}

async fn mount_transfer(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/v1/me/player"))
        .and(body_json(json!({ "device_ids": ["dev-1"], "play": false })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_play(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/play"))
        .and(query_param("device_id", "dev-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn mount_pause(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/pause"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// Requests the mock server received on `route`
async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

fn player_state(uri: &str, is_playing: bool, progress_ms: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "is_playing": is_playing,
        "progress_ms": progress_ms,
        "item": { "uri": uri, "duration_ms": 200_000 }
    }))
}

#[tokio::test]
async fn test_initialize_transfers_playback_and_reports_device() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player"))
        .and(header("authorization", "Bearer spotify-token"))
        .and(body_json(json!({ "device_ids": ["dev-1"], "play": false })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let mut events = capture(&adapter);
    assert!(!adapter.is_ready());

    adapter.initialize().await.unwrap();
    assert!(adapter.is_ready());
    assert_eq!(adapter.device_id().as_deref(), Some("dev-1"));

    let ready = next_event(&mut events).await;
    assert_eq!(ready.provider, Provider::Spotify);
    assert_eq!(ready.generation, 0);
    assert_eq!(
        ready.kind,
        AdapterEventKind::Ready {
            device_id: Some("dev-1".into())
        }
    );

    // Second call is a no-op; the transfer mock expects exactly one hit
    adapter.initialize().await.unwrap();
}

#[tokio::test]
async fn test_named_device_is_looked_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [
                { "id": "phone", "name": "Pixel", "is_active": true, "volume_percent": 40 },
                { "id": "dev-1", "name": "Crossplay", "is_active": false, "volume_percent": null }
            ]
        })))
        .mount(&server)
        .await;
    mount_transfer(&server).await;

    let api = WebApiClient::new(server.uri(), tokens()).unwrap();
    let adapter = SpotifyAdapter::new(
        api,
        Box::new(NamedDeviceConnector::new("crossplay", Duration::from_millis(10))),
    );
    adapter.initialize().await.unwrap();
    assert_eq!(adapter.device_id().as_deref(), Some("dev-1"));
}

#[tokio::test]
async fn test_load_before_ready_is_flushed_after_handshake() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/play"))
        .and(query_param("device_id", "dev-1"))
        .and(body_json(json!({ "uris": ["spotify:track:a"], "position_ms": 12_000 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let mut events = capture(&adapter);

    adapter
        .load_and_play(load(spotify_track("a"), 12_000, 4))
        .await
        .unwrap();
    adapter.initialize().await.unwrap();

    let started = wait_for(&mut events, |k| *k == AdapterEventKind::Started).await;
    assert_eq!(started.generation, 4);
}

#[tokio::test]
async fn test_poller_reports_progress_then_finish() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    mount_play(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(player_state("spotify:track:a", true, 1_000))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(player_state("spotify:track:a", false, 0))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let mut events = capture(&adapter);
    adapter.initialize().await.unwrap();
    adapter
        .load_and_play(load(spotify_track("a"), 0, 7))
        .await
        .unwrap();

    let tick = wait_for(&mut events, |k| matches!(k, AdapterEventKind::PositionTick { .. })).await;
    assert_eq!(tick.generation, 7);
    assert_eq!(tick.kind, AdapterEventKind::PositionTick { position_ms: 1_000 });

    let finished = wait_for(&mut events, |k| *k == AdapterEventKind::Finished).await;
    assert_eq!(finished.generation, 7);
}

#[tokio::test]
async fn test_pause_without_loaded_track_sends_nothing() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/pause"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    adapter.initialize().await.unwrap();
    adapter.pause().await.unwrap();
}

#[tokio::test]
async fn test_resume_requires_device() {
    let server = MockServer::start().await;
    let adapter = adapter_for(&server);

    assert!(matches!(
        adapter.resume().await,
        Err(PlaybackError::NotReady(Provider::Spotify))
    ));
}

#[tokio::test]
async fn test_volume_is_sent_as_percent() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/volume"))
        .and(query_param("device_id", "dev-1"))
        .and(query_param("volume_percent", "70"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    adapter.initialize().await.unwrap();
    adapter.set_volume(0.7).await.unwrap();
}

#[tokio::test]
async fn test_volume_before_ready_is_applied_on_handshake() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/volume"))
        .and(query_param("volume_percent", "25"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    adapter.set_volume(0.25).await.unwrap();
    adapter.initialize().await.unwrap();
}

#[tokio::test]
async fn test_api_failure_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Device not found"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    match adapter.initialize().await.unwrap_err() {
        PlaybackError::Transport { provider, message } => {
            assert_eq!(provider, Provider::Spotify);
            assert!(message.contains("404"));
        }
        other => panic!("Expected transport error, got {other:?}"),
    }
    assert!(!adapter.is_ready());
}

#[tokio::test]
async fn test_token_failure_surfaces_token_error() {
    let server = MockServer::start().await;
    let api = WebApiClient::new(server.uri(), Arc::new(RejectingTokens)).unwrap();
    let adapter = SpotifyAdapter::new(api, Box::new(FixedDeviceConnector::new("dev-1")));

    assert!(matches!(
        adapter.initialize().await,
        Err(PlaybackError::Token(_))
    ));
}

#[tokio::test]
async fn test_load_paused_before_handshake_waits_for_resume() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    mount_play(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let mut events = capture(&adapter);

    adapter
        .load_and_play(load(spotify_track("a"), 0, 3))
        .await
        .unwrap();
    adapter.pause().await.unwrap();
    adapter.initialize().await.unwrap();

    // Handshake leaves the paused load alone
    let ready = next_event(&mut events).await;
    assert!(matches!(ready.kind, AdapterEventKind::Ready { .. }));
    assert_eq!(hits(&server, "/v1/me/player/play").await, 0);

    adapter.seek(30_000).await.unwrap();
    adapter.resume().await.unwrap();
    let started = wait_for(&mut events, |k| *k == AdapterEventKind::Started).await;
    assert_eq!(started.generation, 3);

    let requests = server.received_requests().await.unwrap();
    let play = requests
        .iter()
        .find(|r| r.url.path() == "/v1/me/player/play")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&play.body).unwrap();
    assert_eq!(body, json!({ "uris": ["spotify:track:a"], "position_ms": 30_000 }));
}

#[tokio::test]
async fn test_controller_pause_during_handshake_can_resume() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    mount_play(&server).await;
    mount_pause(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let registry = AdapterRegistry::new().with(Arc::new(adapter_for(&server)));
    let mut controller = PlaybackController::new(
        ControllerConfig::default(),
        registry,
        Arc::new(MemoryStore::new()),
    );

    controller.play_track(spotify_track("a")).await;
    assert_eq!(controller.state().status, PlaybackStatus::Loading);
    controller.toggle_play_pause().await;
    assert_eq!(controller.state().status, PlaybackStatus::Paused);

    controller.initialize_providers().await;
    controller.drain_events();

    controller.toggle_play_pause().await;
    assert_eq!(controller.state().status, PlaybackStatus::Playing);
    assert!(!controller
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlaybackEvent::Error { .. })));
    assert_eq!(hits(&server, "/v1/me/player/play").await, 1);
}

#[tokio::test]
async fn test_pause_stops_the_poller() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    mount_play(&server).await;
    mount_pause(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(player_state("spotify:track:a", true, 1_000))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let mut events = capture(&adapter);
    adapter.initialize().await.unwrap();
    adapter
        .load_and_play(load(spotify_track("a"), 0, 1))
        .await
        .unwrap();
    wait_for(&mut events, |k| matches!(k, AdapterEventKind::PositionTick { .. })).await;

    adapter.pause().await.unwrap();
    drain(&mut events);

    // Let a poll already in flight land before counting
    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls = hits(&server, "/v1/me/player").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(hits(&server, "/v1/me/player").await, polls);
    assert!(drain(&mut events)
        .iter()
        .all(|e| !matches!(e.kind, AdapterEventKind::PositionTick { .. })));
}

#[tokio::test]
async fn test_new_load_cancels_previous_poller() {
    let server = MockServer::start().await;
    mount_transfer(&server).await;
    mount_play(&server).await;
    // Vendor keeps reporting the first track
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(player_state("spotify:track:a", true, 5_000))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let mut events = capture(&adapter);
    adapter.initialize().await.unwrap();
    adapter
        .load_and_play(load(spotify_track("a"), 0, 1))
        .await
        .unwrap();
    let tick = wait_for(&mut events, |k| matches!(k, AdapterEventKind::PositionTick { .. })).await;
    assert_eq!(tick.generation, 1);

    adapter
        .load_and_play(load(spotify_track("b"), 0, 2))
        .await
        .unwrap();
    let queued = drain(&mut events);
    assert!(queued.iter().any(|e| e.kind == AdapterEventKind::Started && e.generation == 2));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(drain(&mut events).iter().all(|e| e.generation == 2));
}

#[tokio::test]
async fn test_unauthorized_response_invalidates_token() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player"))
        .respond_with(ResponseTemplate::new(401).set_body_string("The access token expired"))
        .mount(&server)
        .await;

    let tokens = Arc::new(CountingTokens::default());
    let broker: Arc<dyn crossplay_core::TokenProvider> = Arc::clone(&tokens) as _;
    let api = WebApiClient::new(server.uri(), broker).unwrap();
    let adapter = SpotifyAdapter::new(api, Box::new(FixedDeviceConnector::new("dev-1")));

    assert!(matches!(
        adapter.initialize().await,
        Err(PlaybackError::Transport { .. })
    ));
    assert_eq!(tokens.invalidated.load(Ordering::SeqCst), 1);
}
