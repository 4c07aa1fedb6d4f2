// Binaural Session Core - session playback coordination for the mobile app
// A single coordinator owns the active session and publishes one snapshot
// that every screen renders from.

pub mod api;
pub mod audio;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod http;
pub mod session;
pub mod telemetry;

#[cfg(feature = "bridge")]
mod frb_generated; /* generated by `flutter_rust_bridge_codegen generate` */

pub use coordinator::{PlayerCommand, PlayerSnapshot, PlayerView, SessionCoordinator};
pub use engine::{PlaybackEngine, PositionUpdate};
pub use error::{ErrorCode, PlaybackError, SessionError};
pub use session::{Session, SessionPreset, SessionSpec};

use std::sync::Arc;

use crate::config::AppConfig;

/// Build an engine on the configured backend and wire a coordinator to it.
///
/// Must be called inside a tokio runtime.
pub fn build_coordinator(config: &AppConfig) -> Arc<SessionCoordinator> {
    let backend = engine::create_backend(config);
    let (engine, updates) = PlaybackEngine::new(backend, config);
    SessionCoordinator::new(engine, updates)
}
