//! CPAL-based audio backend for desktop and mobile targets
//!
//! Each loaded resource owns one output stream. `cpal::Stream` is not `Send`
//! on every host, so the stream lives on a dedicated thread that receives
//! play/pause/shutdown commands and answers through oneshot channels. The
//! output callback and the async side share only atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::audio::{AudioClip, BinauralTone};
use crate::config::AudioSessionConfig;
use crate::error::PlaybackError;

use super::{AudioBackend, LoadRequest, ResourceStatus, SoundResource, ToneSource};

/// Backend that plays through the default cpal output device.
#[derive(Default)]
pub struct CpalBackend {
    _unit: (),
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for CpalBackend {
    fn configure_session(
        &self,
        config: AudioSessionConfig,
    ) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            // cpal exposes no session/category API; hosts apply their own policy.
            tracing::info!(
                background = config.stays_active_in_background,
                duck_others = config.duck_others,
                silent_mode = config.plays_in_silent_mode,
                recording = config.allows_recording,
                earpiece = config.play_through_earpiece,
                "audio session policy requested"
            );
            Ok(())
        }
        .boxed()
    }

    fn load(
        &self,
        request: LoadRequest,
    ) -> BoxFuture<'_, Result<Box<dyn SoundResource>, PlaybackError>> {
        async move {
            let shared = Arc::new(OutputShared {
                cursor: AtomicU64::new(0),
                playing: AtomicBool::new(false),
                sample_rate: AtomicU64::new(0),
            });
            let (command_tx, command_rx) = std_mpsc::channel::<OutputCommand>();
            let (ready_tx, ready_rx) = oneshot::channel();

            let thread_shared = Arc::clone(&shared);
            let source = request.source.clone();
            let volume = request.volume.clamp(0.0, 1.0);

            thread::Builder::new()
                .name("binaural-output".to_string())
                .spawn(move || {
                    run_output_thread(source, volume, thread_shared, command_rx, ready_tx)
                })?;

            ready_rx.await.map_err(|_| PlaybackError::ResourceUnavailable {
                reason: "output thread exited during load".to_string(),
            })??;

            tracing::info!(
                frequency_hz = request.frequency_hz,
                source = ?request.source,
                sample_rate = shared.sample_rate.load(Ordering::Relaxed),
                "cpal output stream ready"
            );

            let ticker = spawn_status_ticker(
                Arc::clone(&shared),
                request.status_interval,
                request.status_tx,
            );

            let resource: Box<dyn SoundResource> = Box::new(CpalResource {
                shared,
                commands: std::sync::Mutex::new(command_tx),
                ticker,
            });
            Ok(resource)
        }
        .boxed()
    }
}

struct OutputShared {
    /// Frames rendered while playing since the resource started
    cursor: AtomicU64,
    playing: AtomicBool,
    sample_rate: AtomicU64,
}

impl OutputShared {
    fn status(&self) -> ResourceStatus {
        let rate = self.sample_rate.load(Ordering::Relaxed).max(1);
        ResourceStatus {
            position_secs: self.cursor.load(Ordering::Relaxed) as f64 / rate as f64,
            is_playing: self.playing.load(Ordering::Relaxed),
        }
    }
}

enum OutputCommand {
    Play(oneshot::Sender<Result<(), PlaybackError>>),
    Pause(oneshot::Sender<Result<(), PlaybackError>>),
    Shutdown(oneshot::Sender<Result<(), PlaybackError>>),
}

struct CpalResource {
    shared: Arc<OutputShared>,
    commands: std::sync::Mutex<std_mpsc::Sender<OutputCommand>>,
    ticker: JoinHandle<()>,
}

impl CpalResource {
    async fn send(
        &self,
        operation: &'static str,
        make: impl FnOnce(oneshot::Sender<Result<(), PlaybackError>>) -> OutputCommand,
    ) -> Result<(), PlaybackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let commands = self
                .commands
                .lock()
                .map_err(|_| PlaybackError::LockPoisoned {
                    component: "cpal_commands".to_string(),
                })?;
            commands
                .send(make(reply_tx))
                .map_err(|_| output_gone(operation))?;
        }
        reply_rx.await.map_err(|_| output_gone(operation))?
    }
}

impl SoundResource for CpalResource {
    fn play(&self) -> BoxFuture<'_, Result<(), PlaybackError>> {
        self.send("play", OutputCommand::Play).boxed()
    }

    fn pause(&self) -> BoxFuture<'_, Result<(), PlaybackError>> {
        self.send("pause", OutputCommand::Pause).boxed()
    }

    fn status(&self) -> BoxFuture<'_, Result<ResourceStatus, PlaybackError>> {
        async move { Ok(self.shared.status()) }.boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            self.send("stop", OutputCommand::Pause).await?;
            self.shared.cursor.store(0, Ordering::Relaxed);
            Ok(())
        }
        .boxed()
    }

    fn unload(self: Box<Self>) -> BoxFuture<'static, Result<(), PlaybackError>> {
        async move {
            self.ticker.abort();
            self.shared.playing.store(false, Ordering::Relaxed);
            self.send("unload", OutputCommand::Shutdown)
                .await
                .map_err(|err| PlaybackError::ReleaseFailed {
                    reason: err.to_string(),
                })
        }
        .boxed()
    }
}

fn output_gone(operation: &'static str) -> PlaybackError {
    PlaybackError::ControlFailed {
        operation,
        reason: "output thread is gone".to_string(),
    }
}

fn spawn_status_ticker(
    shared: Arc<OutputShared>,
    interval: std::time::Duration,
    status_tx: tokio::sync::mpsc::UnboundedSender<ResourceStatus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(std::time::Duration::from_millis(10)));
        loop {
            ticker.tick().await;
            if status_tx.send(shared.status()).is_err() {
                break;
            }
        }
    })
}

/// Samples the output callback can render. Clips wrap at their end.
enum Renderer {
    Clip {
        clip: AudioClip,
        /// clip frames advanced per output frame
        rate_ratio: f64,
    },
    Tone(BinauralTone),
}

impl Renderer {
    fn prepare(source: &ToneSource, output_rate: u32) -> Result<Self, PlaybackError> {
        let clip = match source {
            ToneSource::Placeholder => AudioClip::placeholder()?,
            ToneSource::Asset(path) => AudioClip::from_wav(path)?,
            ToneSource::Binaural(tone) => return Ok(Renderer::Tone(*tone)),
        };
        let rate_ratio = clip.sample_rate() as f64 / output_rate as f64;
        Ok(Renderer::Clip { clip, rate_ratio })
    }

    /// Sample for absolute output `frame`.
    #[inline]
    fn sample(&self, frame: u64, channel: usize, output_rate: u32) -> f32 {
        match self {
            Renderer::Clip { clip, rate_ratio } => {
                let source_frame = (frame as f64 * rate_ratio) as usize;
                clip.sample(source_frame % clip.frames(), channel)
            }
            Renderer::Tone(tone) => tone.sample(frame, channel, output_rate),
        }
    }
}

fn run_output_thread(
    source: ToneSource,
    volume: f32,
    shared: Arc<OutputShared>,
    commands: std_mpsc::Receiver<OutputCommand>,
    ready: oneshot::Sender<Result<(), PlaybackError>>,
) {
    let stream = match build_stream(&source, volume, &shared) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    while let Ok(command) = commands.recv() {
        match command {
            OutputCommand::Play(reply) => {
                let result = stream
                    .play()
                    .map(|_| shared.playing.store(true, Ordering::Relaxed))
                    .map_err(|err| PlaybackError::ResourceUnavailable {
                        reason: err.to_string(),
                    });
                let _ = reply.send(result);
            }
            OutputCommand::Pause(reply) => {
                shared.playing.store(false, Ordering::Relaxed);
                let result = stream
                    .pause()
                    .map_err(|err| PlaybackError::ControlFailed {
                        operation: "pause",
                        reason: err.to_string(),
                    });
                let _ = reply.send(result);
            }
            OutputCommand::Shutdown(reply) => {
                shared.playing.store(false, Ordering::Relaxed);
                drop(stream);
                let _ = reply.send(Ok(()));
                return;
            }
        }
    }
}

fn build_stream(
    source: &ToneSource,
    volume: f32,
    shared: &Arc<OutputShared>,
) -> Result<cpal::Stream, PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::ResourceUnavailable {
            reason: "No default output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| PlaybackError::ResourceUnavailable {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    let stream_config: cpal::StreamConfig = config.clone().into();
    let channels_count = stream_config.channels as usize;
    let output_rate = stream_config.sample_rate.0;
    shared.sample_rate.store(output_rate as u64, Ordering::Relaxed);

    let renderer = Renderer::prepare(source, output_rate)?;
    let callback_shared = Arc::clone(shared);

    let err_fn = |err| tracing::warn!("Output stream error: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !callback_shared.playing.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }

                let frame_count = data.len() / channels_count;
                let start = callback_shared.cursor.load(Ordering::Relaxed);

                for (i, out) in data.chunks_exact_mut(channels_count).enumerate() {
                    let frame = start + i as u64;
                    for (ch, slot) in out.iter_mut().enumerate() {
                        *slot = renderer.sample(frame, ch, output_rate) * volume;
                    }
                }

                callback_shared
                    .cursor
                    .fetch_add(frame_count as u64, Ordering::Relaxed);
            },
            err_fn,
            None,
        ),
        _ => {
            return Err(PlaybackError::ResourceUnavailable {
                reason: "Only F32 sample format is currently supported for output".to_string(),
            })
        }
    }
    .map_err(|e| PlaybackError::ResourceUnavailable {
        reason: format!("{:?}", e),
    })?;

    // Some hosts start streams on creation; playback begins on an explicit play.
    stream
        .pause()
        .map_err(|e| PlaybackError::ResourceUnavailable {
            reason: format!("{:?}", e),
        })?;

    Ok(stream)
}
