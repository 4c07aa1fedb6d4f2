use serde::{Deserialize, Serialize};

use crate::session::{format_clock, Session};

/// The single state object every screen renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub is_visible: bool,
    pub is_playing: bool,
    pub current_session: Option<Session>,
    /// Fraction of the session elapsed, in `[0, 1]`
    pub progress: f64,
    pub current_time_seconds: f64,
}

impl PlayerSnapshot {
    pub fn idle() -> Self {
        Self {
            is_visible: false,
            is_playing: false,
            current_session: None,
            progress: 0.0,
            current_time_seconds: 0.0,
        }
    }

    /// `"elapsed / total"` label, e.g. `"15:00 / 30:00"`. `None` while idle.
    pub fn time_label(&self) -> Option<String> {
        self.current_session.as_ref().map(|session| {
            format!(
                "{} / {}",
                format_clock(self.current_time_seconds),
                format_clock(session.duration_seconds() as f64)
            )
        })
    }
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// `min(1, current / duration)`, never negative.
pub fn derive_progress(current_time_seconds: f64, duration_seconds: u64) -> f64 {
    if duration_seconds == 0 || !current_time_seconds.is_finite() {
        return 0.0;
    }
    (current_time_seconds / duration_seconds as f64).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveSession {
    pub session: Session,
    pub generation: u64,
    pub is_playing: bool,
    pub current_time_seconds: f64,
    pub progress: f64,
}

impl ActiveSession {
    pub fn new(session: Session, generation: u64) -> Self {
        Self {
            session,
            generation,
            is_playing: true,
            current_time_seconds: 0.0,
            progress: 0.0,
        }
    }

    /// Apply an engine position. Returns `true` once the session has completed.
    pub fn apply_position(&mut self, position_secs: f64) -> bool {
        self.current_time_seconds = position_secs.max(0.0);
        self.progress = derive_progress(self.current_time_seconds, self.session.duration_seconds());
        self.progress >= 1.0
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) enum CoordinatorState {
    #[default]
    Idle,
    Active(ActiveSession),
}

impl CoordinatorState {
    pub fn snapshot(&self) -> PlayerSnapshot {
        match self {
            CoordinatorState::Idle => PlayerSnapshot::idle(),
            CoordinatorState::Active(active) => PlayerSnapshot {
                is_visible: true,
                is_playing: active.is_playing,
                current_session: Some(active.session.clone()),
                progress: active.progress,
                current_time_seconds: active.current_time_seconds,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(duration: i64) -> Session {
        Session::new("s1", "Deep Focus", "Focus", 12.0, duration).unwrap()
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(derive_progress(0.0, 1800), 0.0);
        assert_eq!(derive_progress(900.0, 1800), 0.5);
        assert_eq!(derive_progress(2000.0, 1800), 1.0);
        assert_eq!(derive_progress(-5.0, 1800), 0.0);
        assert_eq!(derive_progress(f64::NAN, 1800), 0.0);
    }

    #[test]
    fn active_session_detects_completion() {
        let mut active = ActiveSession::new(session(60), 3);
        assert!(!active.apply_position(59.5));
        assert!(active.progress < 1.0);
        assert!(active.apply_position(60.0));
        assert_eq!(active.progress, 1.0);
    }

    #[test]
    fn snapshots_reflect_state() {
        assert_eq!(CoordinatorState::Idle.snapshot(), PlayerSnapshot::idle());

        let mut active = ActiveSession::new(session(1800), 1);
        active.apply_position(900.0);
        let snapshot = CoordinatorState::Active(active).snapshot();
        assert!(snapshot.is_visible);
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.progress, 0.5);
        assert_eq!(snapshot.time_label().as_deref(), Some("15:00 / 30:00"));
        assert_eq!(PlayerSnapshot::idle().time_label(), None);
    }
}
