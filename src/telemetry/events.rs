//! Session lifecycle events exposed to CLI/HTTP surfaces and
//! flutter_rust_bridge streams.

use serde::{Deserialize, Serialize};

/// Telemetry event emitted by the session coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TelemetryEventKind {
    SessionStarted {
        session_id: String,
        frequency_hz: f64,
        generation: u64,
    },
    SessionReplaced {
        previous_id: String,
        session_id: String,
    },
    PlaybackToggled {
        playing: bool,
    },
    SessionCompleted {
        session_id: String,
    },
    SessionClosed {
        session_id: String,
    },
    StartFailed {
        code: i32,
    },
    Warning,
}
