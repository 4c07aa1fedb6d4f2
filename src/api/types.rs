use serde::{Deserialize, Serialize};

use crate::session::SessionPreset;

/// FFI-friendly copy of a built-in preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetInfo {
    pub id: String,
    pub name: String,
    pub category: String,
    pub frequency_hz: f64,
    pub default_duration_seconds: u64,
}

impl From<&SessionPreset> for PresetInfo {
    fn from(preset: &SessionPreset) -> Self {
        Self {
            id: preset.id.to_string(),
            name: preset.name.to_string(),
            category: preset.category.to_string(),
            frequency_hz: preset.frequency_hz,
            default_duration_seconds: preset.default_duration_seconds,
        }
    }
}
