// Session coordinator error types and constants

use crate::error::{ErrorCode, PlaybackError};
use flutter_rust_bridge::frb;
use log::error;
use std::fmt;

/// Session error code constants exposed to Dart via FFI
///
/// Error code range: 2001-2003
#[frb(unignore)]
pub struct SessionErrorCodes {}

#[frb]
impl SessionErrorCodes {
    /// Session input failed validation
    pub const INVALID_SESSION: i32 = 2001;

    /// Playback could not be started for the session
    pub const START_FAILED: i32 = 2002;

    /// Pause/resume of the active session failed
    pub const CONTROL_FAILED: i32 = 2003;

    /// Get INVALID_SESSION error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn invalid_session() -> i32 {
        Self::INVALID_SESSION
    }

    /// Get START_FAILED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn start_failed() -> i32 {
        Self::START_FAILED
    }

    /// Get CONTROL_FAILED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn control_failed() -> i32 {
        Self::CONTROL_FAILED
    }
}

/// Log a session error with its code and the calling context.
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionCoordinator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors reported by the session coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Missing id/name, non-positive frequency or duration
    InvalidSession { reason: String },

    /// The engine failed to start playback; the player is back to idle
    StartFailed { reason: String },

    /// The engine failed to pause or resume
    ControlFailed { reason: String },
}

impl SessionError {
    pub(crate) fn start_failed(err: &PlaybackError) -> Self {
        SessionError::StartFailed {
            reason: err.message(),
        }
    }

    pub(crate) fn control_failed(err: &PlaybackError) -> Self {
        SessionError::ControlFailed {
            reason: err.message(),
        }
    }
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::InvalidSession { .. } => SessionErrorCodes::INVALID_SESSION,
            SessionError::StartFailed { .. } => SessionErrorCodes::START_FAILED,
            SessionError::ControlFailed { .. } => SessionErrorCodes::CONTROL_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::InvalidSession { reason } => format!("Invalid session: {}", reason),
            SessionError::StartFailed { reason } => {
                format!("Failed to start session playback: {}", reason)
            }
            SessionError::ControlFailed { reason } => {
                format!("Failed to toggle playback: {}", reason)
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}
