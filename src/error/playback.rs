// Playback error types and constants

use crate::error::ErrorCode;
use flutter_rust_bridge::frb;
use log::error;
use std::fmt;

/// Playback error code constants exposed to Dart via FFI
///
/// Error code range: 1001-1006
#[frb(unignore)]
pub struct PlaybackErrorCodes {}

#[frb]
impl PlaybackErrorCodes {
    /// The audio resource could not be loaded or played
    pub const RESOURCE_UNAVAILABLE: i32 = 1001;

    /// Stopping or unloading the resource failed
    pub const RELEASE_FAILED: i32 = 1002;

    /// Pause/resume/status call on a loaded resource failed
    pub const CONTROL_FAILED: i32 = 1003;

    /// A newer start or stop replaced this request while it was in flight
    pub const SUPERSEDED: i32 = 1004;

    /// Configuring the device audio session failed
    pub const AUDIO_SESSION_FAILED: i32 = 1005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1006;

    /// Get RESOURCE_UNAVAILABLE error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn resource_unavailable() -> i32 {
        Self::RESOURCE_UNAVAILABLE
    }

    /// Get RELEASE_FAILED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn release_failed() -> i32 {
        Self::RELEASE_FAILED
    }

    /// Get CONTROL_FAILED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn control_failed() -> i32 {
        Self::CONTROL_FAILED
    }

    /// Get SUPERSEDED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn superseded() -> i32 {
        Self::SUPERSEDED
    }

    /// Get AUDIO_SESSION_FAILED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn audio_session_failed() -> i32 {
        Self::AUDIO_SESSION_FAILED
    }

    /// Get LOCK_POISONED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn lock_poisoned() -> i32 {
        Self::LOCK_POISONED
    }
}

/// Log a playback error with its code and the calling context.
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    error!(
        "Playback error in {}: code={}, component=PlaybackEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the playback engine and audio backends.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Asset missing, device unavailable, or the resource refused to play
    ResourceUnavailable { reason: String },

    /// Stop/unload of a loaded resource failed
    ReleaseFailed { reason: String },

    /// Control call on a loaded resource failed
    ControlFailed {
        operation: &'static str,
        reason: String,
    },

    /// Start request was replaced by a newer start/stop
    Superseded { generation: u64 },

    /// Audio session configuration was rejected
    AudioSessionFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::ResourceUnavailable { .. } => PlaybackErrorCodes::RESOURCE_UNAVAILABLE,
            PlaybackError::ReleaseFailed { .. } => PlaybackErrorCodes::RELEASE_FAILED,
            PlaybackError::ControlFailed { .. } => PlaybackErrorCodes::CONTROL_FAILED,
            PlaybackError::Superseded { .. } => PlaybackErrorCodes::SUPERSEDED,
            PlaybackError::AudioSessionFailed { .. } => PlaybackErrorCodes::AUDIO_SESSION_FAILED,
            PlaybackError::LockPoisoned { .. } => PlaybackErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::ResourceUnavailable { reason } => {
                format!("Audio resource unavailable: {}", reason)
            }
            PlaybackError::ReleaseFailed { reason } => {
                format!("Failed to release audio resource: {}", reason)
            }
            PlaybackError::ControlFailed { operation, reason } => {
                format!("Playback {} failed: {}", operation, reason)
            }
            PlaybackError::Superseded { generation } => {
                format!("Start request {} superseded by a newer request", generation)
            }
            PlaybackError::AudioSessionFailed { reason } => {
                format!("Audio session configuration failed: {}", reason)
            }
            PlaybackError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {}

impl From<std::io::Error> for PlaybackError {
    fn from(err: std::io::Error) -> Self {
        PlaybackError::ResourceUnavailable {
            reason: err.to_string(),
        }
    }
}

impl From<hound::Error> for PlaybackError {
    fn from(err: hound::Error) -> Self {
        PlaybackError::ResourceUnavailable {
            reason: err.to_string(),
        }
    }
}
