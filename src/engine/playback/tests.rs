use super::*;
use crate::engine::backend::StubBackend;

const WAIT: Duration = Duration::from_secs(2);

fn stub_engine_with(
    config: AppConfig,
) -> (
    Arc<PlaybackEngine>,
    StubBackend,
    mpsc::UnboundedReceiver<PositionUpdate>,
) {
    let backend = StubBackend::manual();
    let (engine, rx) = PlaybackEngine::new(Arc::new(backend.clone()), &config);
    (Arc::new(engine), backend, rx)
}

fn stub_engine() -> (
    Arc<PlaybackEngine>,
    StubBackend,
    mpsc::UnboundedReceiver<PositionUpdate>,
) {
    stub_engine_with(AppConfig::default())
}

async fn next_update(rx: &mut mpsc::UnboundedReceiver<PositionUpdate>) -> PositionUpdate {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for position update")
        .expect("position feed closed")
}

async fn assert_no_update(rx: &mut mpsc::UnboundedReceiver<PositionUpdate>) {
    tokio::task::yield_now().await;
    let result = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(result.is_err(), "unexpected update: {:?}", result);
}

#[tokio::test]
async fn start_loads_plays_and_forwards_positions() {
    let (engine, backend, mut rx) = stub_engine();

    let generation = engine.start(12.0).await.unwrap();
    assert!(engine.is_loaded());
    assert!(engine.is_playing());
    assert_eq!(backend.load_count(), 1);
    assert_eq!(backend.configure_count(), 1);
    assert_eq!(
        backend.last_session_config(),
        Some(AudioSessionConfig::default())
    );

    let loaded = backend.last_resource().unwrap();
    assert!(loaded.is_playing());
    assert_eq!(loaded.frequency_hz(), 12.0);
    assert_eq!(loaded.source(), &ToneSource::Placeholder);

    loaded.emit_position(1.5);
    let update = next_update(&mut rx).await;
    assert_eq!(
        update,
        PositionUpdate {
            generation,
            position_secs: 1.5
        }
    );
    assert_eq!(engine.position_secs(), 1.5);
}

#[tokio::test]
async fn restart_releases_previous_resource_and_configures_once() {
    let (engine, backend, mut rx) = stub_engine();

    let first = engine.start(12.0).await.unwrap();
    let old_resource = backend.last_resource().unwrap();
    let second = engine.start(8.0).await.unwrap();

    assert!(second > first);
    assert!(old_resource.is_unloaded());
    assert_eq!(backend.load_count(), 2);
    assert_eq!(backend.unload_count(), 1);
    assert_eq!(backend.live_resources(), 1);
    assert_eq!(backend.configure_count(), 1);

    // a replaced resource no longer reports
    assert!(!old_resource.emit_position(99.0));

    let loaded = backend.last_resource().unwrap();
    loaded.emit_position(0.5);
    let update = next_update(&mut rx).await;
    assert_eq!(update.generation, second);
    assert_eq!(update.position_secs, 0.5);
}

#[tokio::test]
async fn stop_releases_and_reports_zero() {
    let (engine, backend, mut rx) = stub_engine();

    let generation = engine.start(12.0).await.unwrap();
    let loaded = backend.last_resource().unwrap();
    loaded.emit_position(42.0);
    next_update(&mut rx).await;

    engine.stop().await;

    assert!(loaded.is_unloaded());
    assert!(!engine.is_loaded());
    assert!(!engine.is_playing());
    assert_eq!(engine.position_secs(), 0.0);
    assert_eq!(backend.live_resources(), 0);

    let update = next_update(&mut rx).await;
    assert_eq!(
        update,
        PositionUpdate {
            generation,
            position_secs: 0.0
        }
    );
}

#[tokio::test]
async fn stop_without_resource_is_noop() {
    let (engine, backend, mut rx) = stub_engine();

    engine.stop().await;

    assert_eq!(backend.unload_count(), 0);
    assert_eq!(backend.configure_count(), 0);
    assert_no_update(&mut rx).await;
}

#[tokio::test]
async fn toggle_without_resource_returns_none() {
    let (engine, backend, _rx) = stub_engine();
    assert_eq!(engine.toggle().await.unwrap(), None);
    assert_eq!(backend.load_count(), 0);
}

#[tokio::test]
async fn toggle_pauses_and_resumes_without_resetting_position() {
    let (engine, backend, mut rx) = stub_engine();

    engine.start(4.0).await.unwrap();
    let loaded = backend.last_resource().unwrap();
    loaded.emit_position(10.0);
    next_update(&mut rx).await;

    assert_eq!(engine.toggle().await.unwrap(), Some(false));
    assert!(!loaded.is_playing());
    assert!(!engine.is_playing());
    assert_eq!(loaded.position_secs(), 10.0);

    // paused resources still report, but nothing is forwarded
    loaded.emit_position(10.0);
    assert_no_update(&mut rx).await;

    assert_eq!(engine.toggle().await.unwrap(), Some(true));
    assert!(loaded.is_playing());
    loaded.emit_position(10.5);
    assert_eq!(next_update(&mut rx).await.position_secs, 10.5);
    assert_eq!(backend.load_count(), 1);
}

#[tokio::test]
async fn load_failure_leaves_engine_empty() {
    let (engine, backend, _rx) = stub_engine();
    backend.fail_next_load("asset missing");

    let err = engine.start(12.0).await.unwrap_err();
    assert!(matches!(err, PlaybackError::ResourceUnavailable { .. }));
    assert!(!engine.is_loaded());
    assert!(!engine.is_playing());

    // engine recovers on the next start
    engine.start(12.0).await.unwrap();
    assert!(engine.is_playing());
}

#[tokio::test]
async fn play_failure_unloads_the_loaded_resource() {
    let (engine, backend, _rx) = stub_engine();
    backend.fail_next_play("output refused");

    let err = engine.start(12.0).await.unwrap_err();
    assert!(matches!(err, PlaybackError::ResourceUnavailable { .. }));
    assert_eq!(backend.load_count(), 1);
    assert_eq!(backend.unload_count(), 1);
    assert_eq!(backend.live_resources(), 0);
    assert!(!engine.is_loaded());
}

#[tokio::test]
async fn stop_during_inflight_start_converges_to_no_resource() {
    let (engine, backend, _rx) = stub_engine();
    backend.hold_loads();

    let starter = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.start(12.0).await })
    };
    while backend.pending_loads() == 0 {
        tokio::task::yield_now().await;
    }

    let stopper = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.stop().await })
    };
    while engine.current_generation() < 2 {
        tokio::task::yield_now().await;
    }

    backend.release_loads();
    let result = starter.await.unwrap();
    stopper.await.unwrap();

    assert!(matches!(result, Err(PlaybackError::Superseded { generation: 1 })));
    assert!(!engine.is_loaded());
    assert_eq!(backend.load_count(), 1);
    assert_eq!(backend.unload_count(), 1);
    assert_eq!(backend.live_resources(), 0);
}

#[tokio::test]
async fn release_failure_is_absorbed() {
    let (engine, backend, _rx) = stub_engine();

    engine.start(12.0).await.unwrap();
    backend.fail_next_unload("device busy");
    engine.stop().await;

    assert!(!engine.is_loaded());
    engine.start(12.0).await.unwrap();
    assert!(engine.is_loaded());
    assert_eq!(backend.live_resources(), 1);
}

#[tokio::test]
async fn binaural_source_carries_session_frequency() {
    let mut config = AppConfig::default();
    config.playback.source = ToneSourceKind::Binaural;
    config.playback.carrier_hz = 180.0;
    let (engine, backend, _rx) = stub_engine_with(config);

    engine.start(7.0).await.unwrap();

    match backend.last_resource().unwrap().source() {
        ToneSource::Binaural(tone) => {
            assert_eq!(tone.left_hz(), 180.0);
            assert_eq!(tone.right_hz(), 187.0);
        }
        other => panic!("expected binaural source, got {:?}", other),
    }
}

#[tokio::test]
async fn asset_override_replaces_placeholder() {
    let mut config = AppConfig::default();
    config.playback.asset_path = Some("/sdcard/rain.wav".into());
    let (engine, backend, _rx) = stub_engine_with(config);

    engine.start(8.0).await.unwrap();

    assert_eq!(
        backend.last_resource().unwrap().source(),
        &ToneSource::Asset("/sdcard/rain.wav".into())
    );
}

#[tokio::test]
async fn rejected_audio_session_still_plays_and_retries() {
    let (engine, backend, _rx) = stub_engine();
    backend.fail_next_configure("category rejected");

    engine.start(12.0).await.unwrap();
    assert!(engine.is_playing());
    assert_eq!(backend.configure_count(), 1);
    assert_eq!(backend.last_session_config(), None);

    engine.start(8.0).await.unwrap();
    assert_eq!(backend.configure_count(), 2);
    assert_eq!(
        backend.last_session_config(),
        Some(AudioSessionConfig::default())
    );

    engine.start(4.0).await.unwrap();
    assert_eq!(backend.configure_count(), 2);
}
