// Error types for the binaural session core
//
// Playback errors come from the engine and its audio backend; session errors
// are what the coordinator reports to its callers. Both carry numeric codes
// suitable for FFI communication.

mod playback;
mod session;

pub use playback::{log_playback_error, PlaybackError, PlaybackErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
