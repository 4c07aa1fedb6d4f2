//! PlaybackEngine: owns at most one loaded audio resource.
//!
//! Every `start` and `stop` bumps a generation counter before touching the
//! backend. Work that finishes under an older generation is released and
//! discarded, and position updates are tagged with the generation of the
//! resource that produced them so consumers can drop stale ones.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::audio::BinauralTone;
use crate::config::{AppConfig, AudioSessionConfig, PlaybackConfig, ToneSourceKind};
use crate::engine::backend::{AudioBackend, LoadRequest, ResourceStatus, SoundResource, ToneSource};
use crate::error::{log_playback_error, ErrorCode, PlaybackError};

/// Peak amplitude of synthesized tones before the volume setting is applied.
const TONE_AMPLITUDE: f32 = 0.5;

/// Position report forwarded to the engine's consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionUpdate {
    pub generation: u64,
    pub position_secs: f64,
}

struct LoadedResource {
    generation: u64,
    resource: Box<dyn SoundResource>,
    forwarder: JoinHandle<()>,
}

#[derive(Default)]
struct EngineSlot {
    loaded: Option<LoadedResource>,
    session_configured: bool,
}

/// Lock-free mirror of the engine state for cheap reads.
#[derive(Default)]
struct PlaybackState {
    loaded: AtomicBool,
    playing: AtomicBool,
    position_bits: AtomicU64,
}

impl PlaybackState {
    fn set(&self, loaded: bool, playing: bool, position_secs: f64) {
        self.loaded.store(loaded, Ordering::SeqCst);
        self.playing.store(playing, Ordering::SeqCst);
        self.set_position(position_secs);
    }

    fn set_position(&self, position_secs: f64) {
        self.position_bits
            .store(position_secs.to_bits(), Ordering::SeqCst);
    }

    fn position(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::SeqCst))
    }
}

pub struct PlaybackEngine {
    backend: Arc<dyn AudioBackend>,
    playback: PlaybackConfig,
    audio_session: AudioSessionConfig,
    slot: Mutex<EngineSlot>,
    generation: Arc<AtomicU64>,
    state: Arc<PlaybackState>,
    updates_tx: mpsc::UnboundedSender<PositionUpdate>,
}

impl PlaybackEngine {
    /// Create an engine and the receiver for its position feed.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        config: &AppConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PositionUpdate>) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let engine = Self {
            backend,
            playback: config.playback.clone(),
            audio_session: config.audio_session.clone(),
            slot: Mutex::new(EngineSlot::default()),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(PlaybackState::default()),
            updates_tx,
        };
        (engine, updates_rx)
    }

    /// Release any current resource, load a new one and start playing it.
    ///
    /// Returns the generation that tags this resource's position updates.
    pub async fn start(&self, frequency_hz: f64) -> Result<u64, PlaybackError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut slot = self.slot.lock().await;

        if let Some(previous) = slot.loaded.take() {
            self.release(previous, "start").await;
        }

        if self.is_stale(generation) {
            return Err(PlaybackError::Superseded { generation });
        }

        if !slot.session_configured {
            match self
                .backend
                .configure_session(self.audio_session.clone())
                .await
            {
                Ok(()) => slot.session_configured = true,
                Err(err) => log_playback_error(&err, "configure_session"),
            }
        }

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let request = self.load_request(frequency_hz, status_tx);
        tracing::info!(
            generation,
            frequency_hz,
            source = ?request.source,
            "loading playback resource"
        );

        let resource = self.backend.load(request).await.map_err(|err| {
            log_playback_error(&err, "load");
            err
        })?;

        if self.is_stale(generation) {
            tracing::debug!(generation, "start superseded while loading");
            unload_logged(resource, "superseded_start").await;
            return Err(PlaybackError::Superseded { generation });
        }

        if let Err(err) = resource.play().await {
            log_playback_error(&err, "play");
            unload_logged(resource, "failed_start").await;
            return Err(err);
        }

        self.state.set(true, true, 0.0);
        let forwarder = self.spawn_forwarder(generation, status_rx);
        slot.loaded = Some(LoadedResource {
            generation,
            resource,
            forwarder,
        });

        Ok(generation)
    }

    /// Halt and release the current resource. No-op when nothing is loaded.
    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.slot.lock().await;

        let Some(loaded) = slot.loaded.take() else {
            return;
        };

        let generation = loaded.generation;
        self.release(loaded, "stop").await;
        let _ = self.updates_tx.send(PositionUpdate {
            generation,
            position_secs: 0.0,
        });
        tracing::info!(generation, "playback stopped");
    }

    /// Pause or resume the current resource.
    ///
    /// Returns the new playing flag, or `None` when nothing is loaded.
    pub async fn toggle(&self) -> Result<Option<bool>, PlaybackError> {
        let slot = self.slot.lock().await;
        let Some(loaded) = slot.loaded.as_ref() else {
            return Ok(None);
        };

        let result: Result<bool, PlaybackError> = async {
            let status = loaded.resource.status().await?;
            if status.is_playing {
                loaded.resource.pause().await?;
            } else {
                loaded.resource.play().await?;
            }
            Ok(!status.is_playing)
        }
        .await;

        match result {
            Ok(playing) => {
                self.state.playing.store(playing, Ordering::SeqCst);
                tracing::debug!(generation = loaded.generation, playing, "playback toggled");
                Ok(Some(playing))
            }
            Err(err) => {
                log_playback_error(&err, "toggle");
                Err(err)
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.state.loaded.load(Ordering::SeqCst)
    }

    /// Last forwarded position of the current resource, 0 when nothing is loaded.
    pub fn position_secs(&self) -> f64 {
        self.state.position()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn load_request(
        &self,
        frequency_hz: f64,
        status_tx: mpsc::UnboundedSender<ResourceStatus>,
    ) -> LoadRequest {
        let source = match self.playback.source {
            ToneSourceKind::Placeholder => match &self.playback.asset_path {
                Some(path) => ToneSource::Asset(path.clone()),
                None => ToneSource::Placeholder,
            },
            ToneSourceKind::Binaural => ToneSource::Binaural(BinauralTone::new(
                self.playback.carrier_hz,
                frequency_hz,
                TONE_AMPLITUDE,
            )),
        };

        LoadRequest {
            source,
            frequency_hz,
            volume: self.playback.volume,
            status_interval: Duration::from_millis(self.playback.status_interval_ms),
            status_tx,
        }
    }

    fn spawn_forwarder(
        &self,
        generation: u64,
        mut status_rx: mpsc::UnboundedReceiver<ResourceStatus>,
    ) -> JoinHandle<()> {
        let current = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let updates_tx = self.updates_tx.clone();

        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }
                if !status.is_playing {
                    continue;
                }
                state.set_position(status.position_secs);
                let update = PositionUpdate {
                    generation,
                    position_secs: status.position_secs,
                };
                if updates_tx.send(update).is_err() {
                    break;
                }
            }
        })
    }

    async fn release(&self, loaded: LoadedResource, context: &str) {
        loaded.forwarder.abort();
        self.state.set(false, false, 0.0);

        if let Err(err) = loaded.resource.stop().await {
            log_playback_error(
                &PlaybackError::ReleaseFailed {
                    reason: err.message(),
                },
                context,
            );
        }
        unload_logged(loaded.resource, context).await;
    }
}

async fn unload_logged(resource: Box<dyn SoundResource>, context: &str) {
    if let Err(err) = resource.unload().await {
        log_playback_error(&err, context);
    }
}

#[cfg(test)]
mod tests;
