//! Backend abstractions for the playback engine.
//!
//! A backend turns a [`LoadRequest`] into a loaded [`SoundResource`]. The
//! resource pushes [`ResourceStatus`] reports on its own cadence through the
//! channel carried by the request; the engine never polls for position.

use std::path::PathBuf;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::audio::BinauralTone;
use crate::config::AudioSessionConfig;
use crate::error::PlaybackError;

/// What a loaded resource plays. Every source loops until stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ToneSource {
    /// Bundled placeholder sound, played regardless of the requested frequency.
    Placeholder,
    /// WAV file overriding the placeholder.
    Asset(PathBuf),
    /// Synthesized stereo beat.
    Binaural(BinauralTone),
}

/// Everything a backend needs to load and report on one resource.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub source: ToneSource,
    /// Beat frequency requested by the session.
    pub frequency_hz: f64,
    pub volume: f32,
    pub status_interval: Duration,
    pub status_tx: mpsc::UnboundedSender<ResourceStatus>,
}

/// Status report pushed by a loaded resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceStatus {
    /// Seconds of audio played since the resource started.
    pub position_secs: f64,
    pub is_playing: bool,
}

/// A loaded, controllable audio resource.
///
/// `unload` consumes the resource so it can be released at most once.
pub trait SoundResource: Send + Sync {
    fn play(&self) -> BoxFuture<'_, Result<(), PlaybackError>>;
    fn pause(&self) -> BoxFuture<'_, Result<(), PlaybackError>>;
    fn status(&self) -> BoxFuture<'_, Result<ResourceStatus, PlaybackError>>;
    fn stop(&self) -> BoxFuture<'_, Result<(), PlaybackError>>;
    fn unload(self: Box<Self>) -> BoxFuture<'static, Result<(), PlaybackError>>;
}

/// Trait implemented by audio output backends.
pub trait AudioBackend: Send + Sync {
    /// Apply the device audio session policy. Called once before the first load.
    fn configure_session(
        &self,
        config: AudioSessionConfig,
    ) -> BoxFuture<'_, Result<(), PlaybackError>>;

    fn load(
        &self,
        request: LoadRequest,
    ) -> BoxFuture<'_, Result<Box<dyn SoundResource>, PlaybackError>>;
}

mod cpal;
pub use self::cpal::CpalBackend;

mod stub;
pub use stub::{StubBackend, StubResourceHandle};
