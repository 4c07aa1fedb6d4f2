//! Session value objects and the built-in preset catalog.
//!
//! A [`Session`] can only be obtained through [`Session::new`] or by
//! deserializing a [`SessionSpec`], so every session the coordinator sees
//! already satisfies its invariants.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Raw, unvalidated session description as submitted by screens.
///
/// `duration_seconds` is signed so that negative input surfaces as an
/// `InvalidSession` error instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub frequency_hz: f64,
    pub duration_seconds: i64,
}

/// A validated listening session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionSpec", into = "SessionSpec")]
pub struct Session {
    id: String,
    name: String,
    category: String,
    frequency_hz: f64,
    duration_seconds: u64,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        frequency_hz: f64,
        duration_seconds: i64,
    ) -> Result<Self, SessionError> {
        let id = id.into();
        let name = name.into();

        if id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(invalid(format!(
                "frequency_hz must be a positive number (got {})",
                frequency_hz
            )));
        }
        if duration_seconds <= 0 {
            return Err(invalid(format!(
                "duration_seconds must be greater than 0 (got {})",
                duration_seconds
            )));
        }

        Ok(Self {
            id,
            name,
            category: category.into(),
            frequency_hz,
            duration_seconds: duration_seconds as u64,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    /// "12 Hz • Focus" style subtitle shown under the session name.
    pub fn subtitle(&self) -> String {
        format!("{} Hz • {}", format_hz(self.frequency_hz), self.category)
    }
}

impl TryFrom<SessionSpec> for Session {
    type Error = SessionError;

    fn try_from(spec: SessionSpec) -> Result<Self, Self::Error> {
        Session::new(
            spec.id,
            spec.name,
            spec.category,
            spec.frequency_hz,
            spec.duration_seconds,
        )
    }
}

impl From<Session> for SessionSpec {
    fn from(session: Session) -> Self {
        SessionSpec {
            id: session.id,
            name: session.name,
            category: session.category,
            frequency_hz: session.frequency_hz,
            duration_seconds: session.duration_seconds as i64,
        }
    }
}

fn invalid(reason: impl Into<String>) -> SessionError {
    SessionError::InvalidSession {
        reason: reason.into(),
    }
}

fn format_hz(hz: f64) -> String {
    if hz.fract() == 0.0 {
        format!("{}", hz as i64)
    } else {
        format!("{:.1}", hz)
    }
}

/// Format whole seconds as `m:ss`.
///
/// Negative and non-finite inputs render as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// A named category with its default beat frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub frequency_hz: f64,
    pub default_duration_seconds: u64,
}

impl SessionPreset {
    /// Build a session from this preset. `None` uses the preset's default length.
    pub fn session(&self, duration_seconds: Option<i64>) -> Result<Session, SessionError> {
        Session::new(
            self.id,
            self.name,
            self.category,
            self.frequency_hz,
            duration_seconds.unwrap_or(self.default_duration_seconds as i64),
        )
    }
}

pub const QUICK_FOCUS: SessionPreset = SessionPreset {
    id: "home-focus-session",
    name: "Quick Focus Session",
    category: "Focus",
    frequency_hz: 12.0,
    default_duration_seconds: 1800,
};

pub const PRESETS: &[SessionPreset] = &[
    QUICK_FOCUS,
    SessionPreset {
        id: "focus",
        name: "Focus",
        category: "Focus",
        frequency_hz: 12.0,
        default_duration_seconds: 1800,
    },
    SessionPreset {
        id: "relax",
        name: "Relax",
        category: "Relax",
        frequency_hz: 8.0,
        default_duration_seconds: 1800,
    },
    SessionPreset {
        id: "sleep",
        name: "Sleep",
        category: "Sleep",
        frequency_hz: 4.0,
        default_duration_seconds: 1800,
    },
    SessionPreset {
        id: "meditation",
        name: "Meditation",
        category: "Meditation",
        frequency_hz: 7.0,
        default_duration_seconds: 1800,
    },
    SessionPreset {
        id: "energy",
        name: "Energy",
        category: "Energy",
        frequency_hz: 16.0,
        default_duration_seconds: 1800,
    },
];

/// Case-insensitive preset lookup.
pub fn find_preset(id: &str) -> Option<&'static SessionPreset> {
    PRESETS
        .iter()
        .find(|preset| preset.id.eq_ignore_ascii_case(id.trim()))
}
