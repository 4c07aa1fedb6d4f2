// Public API for flutter_rust_bridge integration
// Screens drive the player through these functions and render from the
// snapshot they return; nothing here talks to the audio engine directly.

#![allow(dead_code)] // FFI functions are called from Dart, not detected by Rust analyzer

use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::AppConfig;
use crate::coordinator::{PlayerCommand, PlayerSnapshot, SessionCoordinator};
use crate::session::{self, SessionSpec};
use crate::telemetry::TelemetrySnapshot;

mod streams;
mod types;

pub use streams::player_stream;
#[cfg(feature = "bridge")]
pub use streams::player_snapshot_stream;
pub use types::PresetInfo;

// Re-export error code constants for FFI exposure
pub use crate::error::{PlaybackErrorCodes, SessionErrorCodes};

/// Process-wide player: its own runtime plus the coordinator and command queue.
struct PlayerService {
    runtime: tokio::runtime::Runtime,
    coordinator: Arc<SessionCoordinator>,
    commands: mpsc::Sender<PlayerCommand>,
}

impl PlayerService {
    fn init() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("binaural-core")
            .enable_all()
            .build()
            .context("building player runtime")?;

        let config = AppConfig::load();
        let coordinator = {
            let _guard = runtime.enter();
            crate::build_coordinator(&config)
        };
        let commands = coordinator.command_sender();

        crate::http::spawn_if_enabled(Arc::clone(&coordinator));

        Ok(Self {
            runtime,
            coordinator,
            commands,
        })
    }
}

/// Global player instance. `None` when the runtime could not be built; every
/// entry point then degrades to an idle, no-op player.
static PLAYER: Lazy<Option<PlayerService>> = Lazy::new(|| match PlayerService::init() {
    Ok(service) => Some(service),
    Err(err) => {
        log::error!("[API] Player service unavailable: {:#}", err);
        None
    }
});

fn submit(command: PlayerCommand) {
    let Some(service) = PLAYER.as_ref() else {
        log::warn!("[API] Dropping {:?}: player service unavailable", command);
        return;
    };

    match service.commands.try_send(command) {
        Ok(()) => {}
        Err(TrySendError::Full(command)) => {
            log::warn!("[API] Command queue saturated, dropping {:?}", command);
        }
        Err(TrySendError::Closed(command)) => {
            log::error!("[API] Command queue closed, dropping {:?}", command);
        }
    }
}

/// Get the version of the session core
#[flutter_rust_bridge::frb(sync)]
pub fn get_version() -> Result<String> {
    Ok(env!("CARGO_PKG_VERSION").to_string())
}

/// Start (or replace) the active session.
///
/// Fire-and-forget: the command is queued and applied in order. Invalid
/// sessions and playback failures are logged and leave the player idle.
///
/// Returns before the session is active, so a `player_snapshot()` read
/// right after this call may still show the previous state. Render from
/// `player_snapshot_stream` to see the new session as soon as it is
/// published.
#[flutter_rust_bridge::frb(sync)]
pub fn start_session(
    id: String,
    name: String,
    category: String,
    frequency_hz: f64,
    duration_seconds: i64,
) {
    submit(PlayerCommand::Start(SessionSpec {
        id,
        name,
        category,
        frequency_hz,
        duration_seconds,
    }));
}

/// Start one of the built-in presets, optionally overriding its length.
///
/// Queued like [`start_session`]; the new session shows up on the snapshot
/// stream once it is playing.
#[flutter_rust_bridge::frb(sync)]
pub fn start_preset(preset_id: String, duration_seconds: Option<i64>) {
    let Some(preset) = session::find_preset(&preset_id) else {
        log::warn!("[API] Unknown preset '{}'", preset_id);
        return;
    };

    submit(PlayerCommand::Start(SessionSpec {
        id: preset.id.to_string(),
        name: preset.name.to_string(),
        category: preset.category.to_string(),
        frequency_hz: preset.frequency_hz,
        duration_seconds: duration_seconds.unwrap_or(preset.default_duration_seconds as i64),
    }));
}

/// Pause or resume the active session. Ignored while idle.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_play_pause() {
    submit(PlayerCommand::TogglePlayPause);
}

/// Stop playback and hide the player. Ignored while idle.
#[flutter_rust_bridge::frb(sync)]
pub fn close_player() {
    submit(PlayerCommand::Close);
}

/// Current player snapshot.
///
/// Queued commands may not be applied yet; subscribe to
/// `player_snapshot_stream` to follow changes.
#[flutter_rust_bridge::frb(sync)]
pub fn player_snapshot() -> PlayerSnapshot {
    PLAYER
        .as_ref()
        .map(|service| service.coordinator.snapshot())
        .unwrap_or_else(PlayerSnapshot::idle)
}

/// `"m:ss / m:ss"` label for the mini player, `None` while idle.
#[flutter_rust_bridge::frb(sync)]
pub fn player_time_label() -> Option<String> {
    player_snapshot().time_label()
}

/// Recent session lifecycle events.
#[flutter_rust_bridge::frb(sync)]
pub fn telemetry_snapshot() -> Option<TelemetrySnapshot> {
    PLAYER
        .as_ref()
        .map(|service| service.coordinator.telemetry().snapshot())
}

/// Built-in session presets.
#[flutter_rust_bridge::frb(sync)]
pub fn list_presets() -> Vec<PresetInfo> {
    session::PRESETS.iter().map(PresetInfo::from).collect()
}
