//! SessionCoordinator: the single owner of "what is playing".
//!
//! Screens submit commands and observe the published [`PlayerSnapshot`]
//! through a [`PlayerView`]; they never touch the engine. The coordinator is
//! the only writer of the snapshot. Position updates from the engine are
//! applied by a pump task in emission order and dropped when their
//! generation does not match the active session.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};

use crate::engine::{PlaybackEngine, PositionUpdate};
use crate::error::{log_session_error, ErrorCode, SessionError};
use crate::session::{Session, SessionSpec};
use crate::telemetry::{TelemetryCollector, TelemetryEventKind};

mod commands;
mod state;
mod view;

pub use commands::{PlayerCommand, COMMAND_QUEUE_CAPACITY};
pub use state::{derive_progress, PlayerSnapshot};
pub use view::PlayerView;

use state::{ActiveSession, CoordinatorState};
use view::SnapshotPublisher;

pub struct SessionCoordinator {
    engine: PlaybackEngine,
    state: Mutex<CoordinatorState>,
    publisher: SnapshotPublisher,
    view: PlayerView,
    telemetry: Arc<TelemetryCollector>,
    command_tx: mpsc::Sender<PlayerCommand>,
}

impl SessionCoordinator {
    /// Wire the coordinator to an engine and its position feed.
    ///
    /// Spawns the position pump and the command worker, so this must run
    /// inside a tokio runtime. Both tasks end once the coordinator is dropped.
    pub fn new(
        engine: PlaybackEngine,
        updates: mpsc::UnboundedReceiver<PositionUpdate>,
    ) -> Arc<Self> {
        let (publisher, view) = SnapshotPublisher::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let coordinator = Arc::new(Self {
            engine,
            state: Mutex::new(CoordinatorState::Idle),
            publisher,
            view,
            telemetry: Arc::new(TelemetryCollector::default()),
            command_tx,
        });

        spawn_position_pump(Arc::downgrade(&coordinator), updates);
        commands::spawn_command_worker(Arc::downgrade(&coordinator), command_rx);
        coordinator
    }

    /// Read-only handle on the published snapshot.
    pub fn view(&self) -> PlayerView {
        self.view.clone()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.view.snapshot()
    }

    pub fn telemetry(&self) -> Arc<TelemetryCollector> {
        Arc::clone(&self.telemetry)
    }

    /// Ordered, non-blocking entry point for fire-and-forget callers.
    pub fn command_sender(&self) -> mpsc::Sender<PlayerCommand> {
        self.command_tx.clone()
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Make `session` the active session and start its playback.
    ///
    /// Any current session is replaced in a single published step. When the
    /// engine cannot start, the player ends idle and `StartFailed` is returned.
    pub async fn start_session(&self, session: Session) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let previous_id = match &*state {
            CoordinatorState::Active(active) => Some(active.session.id().to_string()),
            CoordinatorState::Idle => None,
        };

        match self.engine.start(session.frequency_hz()).await {
            Ok(generation) => {
                tracing::info!(
                    session_id = session.id(),
                    frequency_hz = session.frequency_hz(),
                    duration_seconds = session.duration_seconds(),
                    generation,
                    "session started"
                );
                if let Some(previous_id) = previous_id {
                    self.telemetry.record(
                        TelemetryEventKind::SessionReplaced {
                            previous_id,
                            session_id: session.id().to_string(),
                        },
                        None,
                    );
                }
                self.telemetry.record(
                    TelemetryEventKind::SessionStarted {
                        session_id: session.id().to_string(),
                        frequency_hz: session.frequency_hz(),
                        generation,
                    },
                    Some(session.name().to_string()),
                );

                *state = CoordinatorState::Active(ActiveSession::new(session, generation));
                self.publisher.publish(state.snapshot());
                Ok(())
            }
            Err(err) => {
                let err = SessionError::start_failed(&err);
                log_session_error(&err, "start_session");
                self.telemetry.record(
                    TelemetryEventKind::StartFailed { code: err.code() },
                    Some(err.message()),
                );

                *state = CoordinatorState::Idle;
                self.publisher.publish(state.snapshot());
                Err(err)
            }
        }
    }

    /// Validate raw input, then [`start_session`](Self::start_session).
    pub async fn start_session_spec(&self, spec: SessionSpec) -> Result<(), SessionError> {
        let session = Session::try_from(spec).map_err(|err| {
            log_session_error(&err, "start_session_spec");
            err
        })?;
        self.start_session(session).await
    }

    /// Pause or resume the active session. No-op while idle.
    pub async fn toggle_play_pause(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let CoordinatorState::Active(active) = &mut *state else {
            tracing::debug!("toggle ignored: no active session");
            return Ok(());
        };

        match self.engine.toggle().await {
            Ok(Some(playing)) => {
                active.is_playing = playing;
                self.telemetry
                    .record(TelemetryEventKind::PlaybackToggled { playing }, None);
                self.publisher.publish(state.snapshot());
                Ok(())
            }
            Ok(None) => {
                tracing::warn!(
                    session_id = active.session.id(),
                    "toggle with no loaded resource"
                );
                self.telemetry.warn("toggle with no loaded resource");
                Ok(())
            }
            Err(err) => {
                let err = SessionError::control_failed(&err);
                log_session_error(&err, "toggle_play_pause");
                Err(err)
            }
        }
    }

    /// Stop playback and return to idle. No-op while idle.
    pub async fn close_player(&self) {
        let mut state = self.state.lock().await;
        let CoordinatorState::Active(active) = &*state else {
            tracing::debug!("close ignored: no active session");
            return;
        };
        let session_id = active.session.id().to_string();

        self.engine.stop().await;
        *state = CoordinatorState::Idle;
        self.publisher.publish(state.snapshot());

        tracing::info!(session_id = %session_id, "session closed");
        self.telemetry
            .record(TelemetryEventKind::SessionClosed { session_id }, None);
    }

    /// Run one queued command.
    pub async fn execute(&self, command: PlayerCommand) -> Result<(), SessionError> {
        match command {
            PlayerCommand::Start(spec) => self.start_session_spec(spec).await,
            PlayerCommand::TogglePlayPause => self.toggle_play_pause().await,
            PlayerCommand::Close => {
                self.close_player().await;
                Ok(())
            }
        }
    }

    pub(crate) async fn apply_position(&self, update: PositionUpdate) {
        let mut state = self.state.lock().await;
        let completed = match &mut *state {
            CoordinatorState::Active(active) if active.generation == update.generation => {
                active.apply_position(update.position_secs)
            }
            _ => {
                tracing::trace!(
                    generation = update.generation,
                    "discarding stale position update"
                );
                return;
            }
        };

        self.publisher.publish(state.snapshot());
        if !completed {
            return;
        }

        let session_id = match &*state {
            CoordinatorState::Active(active) => active.session.id().to_string(),
            CoordinatorState::Idle => return,
        };
        self.engine.stop().await;
        *state = CoordinatorState::Idle;
        self.publisher.publish(state.snapshot());

        tracing::info!(session_id = %session_id, "session completed");
        self.telemetry
            .record(TelemetryEventKind::SessionCompleted { session_id }, None);
    }
}

fn spawn_position_pump(
    coordinator: Weak<SessionCoordinator>,
    mut updates: mpsc::UnboundedReceiver<PositionUpdate>,
) {
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            let Some(coordinator) = coordinator.upgrade() else {
                break;
            };
            coordinator.apply_position(update).await;
        }
    });
}

#[cfg(test)]
mod tests;
