//! Configuration management for the playback core
//!
//! Runtime configuration is loaded from a JSON file so the audio source,
//! backend and status cadence can be changed without recompiling. Every
//! section falls back to its defaults when omitted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub playback: PlaybackConfig,
    pub audio_session: AudioSessionConfig,
    pub stub: StubClockConfig,
}

/// Which audio backend drives playback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Cpal,
    Stub,
}

/// What the loaded resource plays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneSourceKind {
    /// Fixed placeholder asset, independent of the session frequency
    #[default]
    Placeholder,
    /// Synthesized stereo tone whose channel difference equals the session frequency
    Binaural,
}

/// Playback engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub backend: BackendKind,
    pub source: ToneSourceKind,
    /// WAV file replacing the bundled placeholder sound. Resources always loop.
    pub asset_path: Option<PathBuf>,
    /// Output gain in 0.0..=1.0
    pub volume: f32,
    /// How often a loaded resource reports its position
    pub status_interval_ms: u64,
    /// Left channel frequency for binaural synthesis
    pub carrier_hz: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Cpal,
            source: ToneSourceKind::Placeholder,
            asset_path: None,
            volume: 1.0,
            status_interval_ms: 500,
            carrier_hz: 200.0,
        }
    }
}

/// Device audio session requirements applied before the first load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSessionConfig {
    pub stays_active_in_background: bool,
    pub duck_others: bool,
    pub plays_in_silent_mode: bool,
    pub allows_recording: bool,
    pub play_through_earpiece: bool,
}

impl Default for AudioSessionConfig {
    fn default() -> Self {
        Self {
            stays_active_in_background: true,
            duck_others: true,
            plays_in_silent_mode: true,
            allows_recording: false,
            play_through_earpiece: false,
        }
    }
}

/// Clock settings for the in-process stub backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubClockConfig {
    /// Advance positions on a timer instead of waiting for injected ticks
    pub auto_clock: bool,
    pub tick_ms: u64,
    /// Simulated seconds per real second
    pub speed: f64,
}

impl Default for StubClockConfig {
    fn default() -> Self {
        Self {
            auto_clock: false,
            tick_ms: 250,
            speed: 1.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing or malformed files are logged and replaced by defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load the bundled player configuration
    pub fn load() -> Self {
        Self::load_from_file("assets/player_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.playback.backend, BackendKind::Cpal);
        assert_eq!(config.playback.source, ToneSourceKind::Placeholder);
        assert_eq!(config.playback.asset_path, None);
        assert_eq!(config.playback.status_interval_ms, 500);
        assert!(config.audio_session.stays_active_in_background);
        assert!(config.audio_session.duck_others);
        assert!(!config.audio_session.allows_recording);
        assert!(!config.audio_session.play_through_earpiece);
        assert!(!config.stub.auto_clock);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"playback":{"source":"binaural","carrier_hz":180.0}}"#)
                .unwrap();
        assert_eq!(parsed.playback.source, ToneSourceKind::Binaural);
        assert_eq!(parsed.playback.carrier_hz, 180.0);
        assert_eq!(parsed.playback.status_interval_ms, 500);
        assert_eq!(parsed.audio_session, AudioSessionConfig::default());
    }

    #[test]
    fn asset_override_is_optional() {
        let parsed: AppConfig = serde_json::from_str(
            r#"{"playback":{"asset_path":"/sdcard/rain.wav","looping":false}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.playback.asset_path,
            Some(PathBuf::from("/sdcard/rain.wav"))
        );
        assert_eq!(parsed.playback.volume, 1.0);
    }

    #[test]
    fn load_from_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"playback":{{"backend":"stub"}},"stub":{{"auto_clock":true}}}}"#)
            .unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.playback.backend, BackendKind::Stub);
        assert!(config.stub.auto_clock);
    }

    #[test]
    fn load_from_file_falls_back_on_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = AppConfig::load_from_file(dir.path().join("absent.json"));
        assert_eq!(missing, AppConfig::default());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from_file(&bad), AppConfig::default());
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/player_config.json");
        assert_eq!(AppConfig::load_from_file(path), AppConfig::default());
    }
}
