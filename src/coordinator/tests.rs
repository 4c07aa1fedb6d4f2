use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::config::AppConfig;
use crate::engine::StubBackend;
use crate::telemetry::TelemetryEventKind;

const WAIT: Duration = Duration::from_secs(2);

fn coordinator() -> (Arc<SessionCoordinator>, StubBackend) {
    let backend = StubBackend::manual();
    let (engine, updates) = PlaybackEngine::new(Arc::new(backend.clone()), &AppConfig::default());
    (SessionCoordinator::new(engine, updates), backend)
}

fn session(id: &str, duration: i64) -> Session {
    Session::new(id, format!("Session {id}"), "Focus", 12.0, duration).unwrap()
}

async fn wait_for(
    view: &PlayerView,
    mut predicate: impl FnMut(&PlayerSnapshot) -> bool,
) -> PlayerSnapshot {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let snapshot = view.snapshot();
        if predicate(&snapshot) {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out; last snapshot {:?}",
            snapshot
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn emit(backend: &StubBackend, view: &PlayerView, position: f64) -> PlayerSnapshot {
    backend
        .last_resource()
        .expect("loaded resource")
        .emit_position(position);
    wait_for(view, |s| s.current_time_seconds == position || !s.is_visible).await
}

fn count_kind(coordinator: &SessionCoordinator, f: impl Fn(&TelemetryEventKind) -> bool) -> usize {
    coordinator
        .telemetry()
        .snapshot()
        .recent
        .iter()
        .filter(|event| f(&event.kind))
        .count()
}

#[tokio::test]
async fn start_from_idle_publishes_fresh_session() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    assert_eq!(view.snapshot(), PlayerSnapshot::idle());

    let s = session("a", 1800);
    coordinator.start_session(s.clone()).await.unwrap();

    let snapshot = view.snapshot();
    assert!(snapshot.is_visible);
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.current_session, Some(s));
    assert_eq!(snapshot.progress, 0.0);
    assert_eq!(snapshot.current_time_seconds, 0.0);

    let loaded = backend.last_resource().unwrap();
    assert_eq!(loaded.frequency_hz(), 12.0);
    assert!(loaded.is_playing());
}

#[tokio::test]
async fn progress_tracks_position_of_thirty_minute_session() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    coordinator.start_session(session("a", 1800)).await.unwrap();

    let quarter = emit(&backend, &view, 450.0).await;
    assert_eq!(quarter.progress, 0.25);

    let half = emit(&backend, &view, 900.0).await;
    assert_eq!(half.progress, 0.5);
    assert_eq!(half.current_time_seconds, 900.0);
    assert_eq!(half.time_label().as_deref(), Some("15:00 / 30:00"));
    assert!(half.is_visible);
    assert!(half.is_playing);
}

#[tokio::test]
async fn completion_fires_once_and_returns_to_idle() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    let mut rx = view.subscribe();

    coordinator.start_session(session("a", 60)).await.unwrap();
    let generation = coordinator.engine().current_generation();
    let loaded = backend.last_resource().unwrap();
    loaded.emit_position(60.0);

    wait_for(&view, |s| !s.is_visible).await;

    let started = rx.recv().await.unwrap();
    assert!(started.is_visible);
    let completed = rx.recv().await.unwrap();
    assert!(completed.is_visible);
    assert_eq!(completed.progress, 1.0);
    let idle = rx.recv().await.unwrap();
    assert_eq!(idle, PlayerSnapshot::idle());

    assert!(loaded.is_unloaded());
    assert_eq!(backend.live_resources(), 0);

    // late update for the finished session
    coordinator
        .apply_position(PositionUpdate {
            generation,
            position_secs: 61.0,
        })
        .await;
    assert_eq!(view.snapshot(), PlayerSnapshot::idle());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    assert_eq!(
        count_kind(&coordinator, |k| matches!(
            k,
            TelemetryEventKind::SessionCompleted { .. }
        )),
        1
    );
}

#[tokio::test]
async fn replacing_a_session_jumps_straight_to_the_new_one() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();

    coordinator.start_session(session("a", 1800)).await.unwrap();
    let first_generation = coordinator.engine().current_generation();
    let first = backend.last_resource().unwrap();
    emit(&backend, &view, 600.0).await;

    let mut rx = view.subscribe();
    let b = session("b", 900);
    coordinator.start_session(b.clone()).await.unwrap();

    let next = rx.recv().await.unwrap();
    assert_eq!(next.current_session, Some(b.clone()));
    assert_eq!(next.current_time_seconds, 0.0);
    assert_eq!(next.progress, 0.0);
    assert!(first.is_unloaded());
    assert_eq!(backend.live_resources(), 1);

    // position from the replaced session is ignored
    coordinator
        .apply_position(PositionUpdate {
            generation: first_generation,
            position_secs: 601.0,
        })
        .await;
    let snapshot = view.snapshot();
    assert_eq!(snapshot.current_session, Some(b));
    assert_eq!(snapshot.current_time_seconds, 0.0);

    assert_eq!(
        count_kind(&coordinator, |k| matches!(
            k,
            TelemetryEventKind::SessionReplaced { .. }
        )),
        1
    );
}

#[tokio::test]
async fn close_and_toggle_while_idle_are_noops() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    let mut rx = view.subscribe();

    coordinator.close_player().await;
    coordinator.toggle_play_pause().await.unwrap();

    assert_eq!(view.snapshot(), PlayerSnapshot::idle());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(backend.load_count(), 0);
    assert_eq!(backend.unload_count(), 0);
    assert_eq!(backend.configure_count(), 0);
}

#[tokio::test]
async fn pause_and_resume_keep_elapsed_time() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    coordinator.start_session(session("a", 1800)).await.unwrap();
    emit(&backend, &view, 300.0).await;

    coordinator.toggle_play_pause().await.unwrap();
    let paused = view.snapshot();
    assert!(!paused.is_playing);
    assert!(paused.is_visible);
    assert_eq!(paused.current_time_seconds, 300.0);

    coordinator.toggle_play_pause().await.unwrap();
    let resumed = view.snapshot();
    assert!(resumed.is_playing);
    assert_eq!(resumed.current_time_seconds, 300.0);
    assert_eq!(backend.load_count(), 1);
}

#[tokio::test]
async fn close_player_releases_resource() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    coordinator.start_session(session("a", 1800)).await.unwrap();
    emit(&backend, &view, 10.0).await;

    coordinator.close_player().await;

    assert_eq!(view.snapshot(), PlayerSnapshot::idle());
    assert!(!view.is_visible());
    assert_eq!(backend.live_resources(), 0);
    assert!(!coordinator.engine().is_loaded());
}

#[tokio::test]
async fn start_failure_rolls_back_to_idle() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    coordinator.start_session(session("a", 1800)).await.unwrap();

    backend.fail_next_load("asset missing");
    let err = coordinator.start_session(session("b", 600)).await.unwrap_err();

    assert!(matches!(err, SessionError::StartFailed { .. }));
    assert_eq!(view.snapshot(), PlayerSnapshot::idle());
    assert_eq!(backend.live_resources(), 0);
    assert_eq!(
        count_kind(&coordinator, |k| matches!(
            k,
            TelemetryEventKind::StartFailed { .. }
        )),
        1
    );
}

#[tokio::test]
async fn invalid_spec_is_rejected_before_engine() {
    let (coordinator, backend) = coordinator();
    let spec = SessionSpec {
        id: String::new(),
        name: "No id".to_string(),
        category: "Focus".to_string(),
        frequency_hz: 12.0,
        duration_seconds: 600,
    };

    let err = coordinator.start_session_spec(spec).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidSession { .. }));
    assert_eq!(backend.load_count(), 0);
    assert_eq!(coordinator.snapshot(), PlayerSnapshot::idle());
}

#[tokio::test]
async fn queued_commands_apply_in_order() {
    let (coordinator, backend) = coordinator();
    let view = coordinator.view();
    let sender = coordinator.command_sender();

    let spec = |id: &str| SessionSpec {
        id: id.to_string(),
        name: id.to_uppercase(),
        category: "Relax".to_string(),
        frequency_hz: 8.0,
        duration_seconds: 1200,
    };

    sender.try_send(PlayerCommand::Start(spec("a"))).unwrap();
    sender.try_send(PlayerCommand::TogglePlayPause).unwrap();
    sender.try_send(PlayerCommand::Close).unwrap();
    sender.try_send(PlayerCommand::Start(spec("b"))).unwrap();
    sender.try_send(PlayerCommand::TogglePlayPause).unwrap();

    let snapshot = wait_for(&view, |s| {
        s.current_session.as_ref().map(|x| x.id()) == Some("b") && !s.is_playing
    })
    .await;
    assert!(snapshot.is_visible);
    assert_eq!(backend.load_count(), 2);
    assert_eq!(backend.live_resources(), 1);

    let kinds: Vec<_> = coordinator
        .telemetry()
        .snapshot()
        .recent
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert!(matches!(
        kinds.as_slice(),
        [
            TelemetryEventKind::SessionStarted { .. },
            TelemetryEventKind::PlaybackToggled { playing: false },
            TelemetryEventKind::SessionClosed { .. },
            TelemetryEventKind::SessionStarted { .. },
            TelemetryEventKind::PlaybackToggled { playing: false },
        ]
    ));
}
