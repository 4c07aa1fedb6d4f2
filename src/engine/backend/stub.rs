use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::config::{AudioSessionConfig, StubClockConfig};
use crate::error::PlaybackError;

use super::{AudioBackend, LoadRequest, ResourceStatus, SoundResource, ToneSource};

/// In-process backend used for deterministic tests, the CLI and the debug server.
///
/// With a manual clock nothing moves until a test calls
/// [`StubResourceHandle::emit_position`]. With an auto clock every loaded
/// resource advances on a tokio interval while playing.
#[derive(Clone)]
pub struct StubBackend {
    shared: Arc<StubShared>,
}

#[derive(Clone, Copy)]
enum StubClock {
    Manual,
    Auto { tick: Duration, speed: f64 },
}

struct StubShared {
    clock: StubClock,
    load_count: AtomicUsize,
    unload_count: AtomicUsize,
    configure_count: AtomicUsize,
    pending_loads: AtomicUsize,
    live_resources: AtomicUsize,
    fail_next_configure: Mutex<Option<String>>,
    fail_next_load: Mutex<Option<String>>,
    fail_next_play: Mutex<Option<String>>,
    fail_next_unload: Mutex<Option<String>>,
    holding_loads: AtomicBool,
    load_gate: Notify,
    last_session: Mutex<Option<AudioSessionConfig>>,
    resources: Mutex<Vec<StubResourceHandle>>,
}

impl StubBackend {
    /// Stub whose positions only change through [`StubResourceHandle::emit_position`].
    pub fn manual() -> Self {
        Self::with_clock(StubClock::Manual)
    }

    /// Stub whose resources advance `tick * speed` seconds every `tick` while playing.
    pub fn auto(tick: Duration, speed: f64) -> Self {
        Self::with_clock(StubClock::Auto {
            tick: tick.max(Duration::from_millis(1)),
            speed: if speed.is_finite() && speed > 0.0 {
                speed
            } else {
                1.0
            },
        })
    }

    pub fn from_config(config: &StubClockConfig) -> Self {
        if config.auto_clock {
            Self::auto(Duration::from_millis(config.tick_ms), config.speed)
        } else {
            Self::manual()
        }
    }

    fn with_clock(clock: StubClock) -> Self {
        Self {
            shared: Arc::new(StubShared {
                clock,
                load_count: AtomicUsize::new(0),
                unload_count: AtomicUsize::new(0),
                configure_count: AtomicUsize::new(0),
                pending_loads: AtomicUsize::new(0),
                live_resources: AtomicUsize::new(0),
                fail_next_configure: Mutex::new(None),
                fail_next_load: Mutex::new(None),
                fail_next_play: Mutex::new(None),
                fail_next_unload: Mutex::new(None),
                holding_loads: AtomicBool::new(false),
                load_gate: Notify::new(),
                last_session: Mutex::new(None),
                resources: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn fail_next_configure(&self, reason: impl Into<String>) {
        set_slot(&self.shared.fail_next_configure, Some(reason.into()));
    }

    pub fn fail_next_load(&self, reason: impl Into<String>) {
        set_slot(&self.shared.fail_next_load, Some(reason.into()));
    }

    pub fn fail_next_play(&self, reason: impl Into<String>) {
        set_slot(&self.shared.fail_next_play, Some(reason.into()));
    }

    pub fn fail_next_unload(&self, reason: impl Into<String>) {
        set_slot(&self.shared.fail_next_unload, Some(reason.into()));
    }

    /// Park every subsequent load until [`release_loads`](Self::release_loads).
    pub fn hold_loads(&self) {
        self.shared.holding_loads.store(true, Ordering::SeqCst);
    }

    pub fn release_loads(&self) {
        self.shared.holding_loads.store(false, Ordering::SeqCst);
        self.shared.load_gate.notify_waiters();
    }

    /// Loads currently parked at the gate.
    pub fn pending_loads(&self) -> usize {
        self.shared.pending_loads.load(Ordering::SeqCst)
    }

    /// Successful loads so far.
    pub fn load_count(&self) -> usize {
        self.shared.load_count.load(Ordering::SeqCst)
    }

    /// Unload calls so far, failed ones included.
    pub fn unload_count(&self) -> usize {
        self.shared.unload_count.load(Ordering::SeqCst)
    }

    pub fn configure_count(&self) -> usize {
        self.shared.configure_count.load(Ordering::SeqCst)
    }

    /// Resources loaded and not yet unloaded.
    pub fn live_resources(&self) -> usize {
        self.shared.live_resources.load(Ordering::SeqCst)
    }

    pub fn last_session_config(&self) -> Option<AudioSessionConfig> {
        self.shared
            .last_session
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    /// Handle on the most recently loaded resource.
    pub fn last_resource(&self) -> Option<StubResourceHandle> {
        self.resources().pop()
    }

    /// Handles on every resource loaded so far, oldest first.
    pub fn resources(&self) -> Vec<StubResourceHandle> {
        self.shared
            .resources
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    async fn wait_for_gate(&self) {
        if !self.shared.holding_loads.load(Ordering::SeqCst) {
            return;
        }
        self.shared.pending_loads.fetch_add(1, Ordering::SeqCst);
        loop {
            let notified = self.shared.load_gate.notified();
            if !self.shared.holding_loads.load(Ordering::SeqCst) {
                break;
            }
            notified.await;
        }
        self.shared.pending_loads.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::manual()
    }
}

impl AudioBackend for StubBackend {
    fn configure_session(
        &self,
        config: AudioSessionConfig,
    ) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            self.shared.configure_count.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = take_slot(&self.shared.fail_next_configure) {
                return Err(PlaybackError::AudioSessionFailed { reason });
            }
            set_slot(&self.shared.last_session, Some(config));
            Ok(())
        }
        .boxed()
    }

    fn load(
        &self,
        request: LoadRequest,
    ) -> BoxFuture<'_, Result<Box<dyn SoundResource>, PlaybackError>> {
        async move {
            self.wait_for_gate().await;

            if let Some(reason) = take_slot(&self.shared.fail_next_load) {
                return Err(PlaybackError::ResourceUnavailable { reason });
            }

            let state = Arc::new(SharedResourceState {
                frequency_hz: request.frequency_hz,
                source: request.source,
                position_secs: Mutex::new(0.0),
                playing: AtomicBool::new(false),
                unloaded: AtomicBool::new(false),
                status_tx: request.status_tx,
            });
            let handle = StubResourceHandle {
                state: Arc::clone(&state),
            };

            let ticker = match self.shared.clock {
                StubClock::Manual => None,
                StubClock::Auto { tick, speed } => Some(spawn_ticker(handle.clone(), tick, speed)),
            };

            self.shared.load_count.fetch_add(1, Ordering::SeqCst);
            self.shared.live_resources.fetch_add(1, Ordering::SeqCst);
            self.shared
                .resources
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .push(handle.clone());

            let resource: Box<dyn SoundResource> = Box::new(StubResource {
                handle,
                shared: Arc::clone(&self.shared),
                ticker,
            });
            Ok(resource)
        }
        .boxed()
    }
}

struct SharedResourceState {
    frequency_hz: f64,
    source: ToneSource,
    position_secs: Mutex<f64>,
    playing: AtomicBool,
    unloaded: AtomicBool,
    status_tx: mpsc::UnboundedSender<ResourceStatus>,
}

/// Test-side view of one stub resource.
#[derive(Clone)]
pub struct StubResourceHandle {
    state: Arc<SharedResourceState>,
}

impl StubResourceHandle {
    /// Set the position and push a status report, as the audio system would.
    ///
    /// Nothing is reported once the resource has been unloaded.
    pub fn emit_position(&self, position_secs: f64) -> bool {
        if self.is_unloaded() {
            return false;
        }
        *self
            .state
            .position_secs
            .lock()
            .unwrap_or_else(|err| err.into_inner()) = position_secs;
        self.push_status()
    }

    fn advance(&self, delta_secs: f64) -> bool {
        if self.is_unloaded() {
            return false;
        }
        if self.is_playing() {
            let mut position = self
                .state
                .position_secs
                .lock()
                .unwrap_or_else(|err| err.into_inner());
            *position += delta_secs;
        }
        self.push_status()
    }

    fn push_status(&self) -> bool {
        self.state.status_tx.send(self.status()).is_ok()
    }

    pub fn status(&self) -> ResourceStatus {
        ResourceStatus {
            position_secs: self.position_secs(),
            is_playing: self.is_playing(),
        }
    }

    pub fn position_secs(&self) -> f64 {
        *self
            .state
            .position_secs
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing.load(Ordering::SeqCst)
    }

    pub fn is_unloaded(&self) -> bool {
        self.state.unloaded.load(Ordering::SeqCst)
    }

    pub fn frequency_hz(&self) -> f64 {
        self.state.frequency_hz
    }

    pub fn source(&self) -> &ToneSource {
        &self.state.source
    }
}

struct StubResource {
    handle: StubResourceHandle,
    shared: Arc<StubShared>,
    ticker: Option<JoinHandle<()>>,
}

impl StubResource {
    fn ensure_loaded(&self, operation: &'static str) -> Result<(), PlaybackError> {
        if self.handle.is_unloaded() {
            return Err(PlaybackError::ControlFailed {
                operation,
                reason: "resource already unloaded".to_string(),
            });
        }
        Ok(())
    }
}

impl SoundResource for StubResource {
    fn play(&self) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            self.ensure_loaded("play")?;
            if let Some(reason) = take_slot(&self.shared.fail_next_play) {
                return Err(PlaybackError::ResourceUnavailable { reason });
            }
            self.handle.state.playing.store(true, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn pause(&self) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            self.ensure_loaded("pause")?;
            self.handle.state.playing.store(false, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn status(&self) -> BoxFuture<'_, Result<ResourceStatus, PlaybackError>> {
        async move {
            self.ensure_loaded("status")?;
            Ok(self.handle.status())
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            self.ensure_loaded("stop")?;
            self.handle.state.playing.store(false, Ordering::SeqCst);
            *self
                .handle
                .state
                .position_secs
                .lock()
                .unwrap_or_else(|err| err.into_inner()) = 0.0;
            Ok(())
        }
        .boxed()
    }

    fn unload(self: Box<Self>) -> BoxFuture<'static, Result<(), PlaybackError>> {
        async move {
            if let Some(ticker) = &self.ticker {
                ticker.abort();
            }
            self.shared.unload_count.fetch_add(1, Ordering::SeqCst);
            self.handle.state.playing.store(false, Ordering::SeqCst);
            if !self.handle.state.unloaded.swap(true, Ordering::SeqCst) {
                self.shared.live_resources.fetch_sub(1, Ordering::SeqCst);
            }
            match take_slot(&self.shared.fail_next_unload) {
                Some(reason) => Err(PlaybackError::ReleaseFailed { reason }),
                None => Ok(()),
            }
        }
        .boxed()
    }
}

fn spawn_ticker(handle: StubResourceHandle, tick: Duration, speed: f64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            interval.tick().await;
            if !handle.advance(tick.as_secs_f64() * speed) {
                break;
            }
        }
    })
}

fn set_slot<T>(slot: &Mutex<Option<T>>, value: Option<T>) {
    *slot.lock().unwrap_or_else(|err| err.into_inner()) = value;
}

fn take_slot<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(|err| err.into_inner()).take()
}
