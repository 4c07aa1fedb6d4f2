//! Engine module housing the playback core.
//!
//! `backend` holds the audio-system seam (cpal output and the in-process
//! stub); `playback` holds the `PlaybackEngine` that owns the single loaded
//! resource.

use std::sync::Arc;

use crate::config::{AppConfig, BackendKind};

pub mod backend;
pub mod playback;

pub use backend::{AudioBackend, CpalBackend, StubBackend, StubResourceHandle};
pub use playback::{PlaybackEngine, PositionUpdate};

/// Build the backend selected by `config.playback.backend`.
pub fn create_backend(config: &AppConfig) -> Arc<dyn AudioBackend> {
    match config.playback.backend {
        BackendKind::Cpal => Arc::new(CpalBackend::new()),
        BackendKind::Stub => Arc::new(StubBackend::from_config(&config.stub)),
    }
}
