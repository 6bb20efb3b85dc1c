//! Phrase generation settings - what the trainer asks the engine to build.
//!
//! Values are stored as written in the config file. The engine validates
//! them (key spelling, note values, staff caps) when it builds a phrase.

use serde::{Deserialize, Serialize};

/// Settings for one staff of the grand staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSettings {
    /// Lowest staff-position index (inclusive). 0 is middle C.
    pub min_index: i32,

    /// Highest staff-position index (inclusive).
    pub max_index: i32,

    /// Number of chords to draw for this staff.
    pub note_count: u32,

    /// Note value of each chord: "whole", "half", "quarter" or "eighth".
    pub note_value: String,
}

impl StaffSettings {
    pub fn default_top() -> Self {
        Self {
            min_index: 0,
            max_index: 11,
            note_count: 3,
            note_value: "quarter".to_string(),
        }
    }

    pub fn default_bottom() -> Self {
        Self {
            min_index: -11,
            max_index: 0,
            note_count: 1,
            note_value: "half".to_string(),
        }
    }
}

/// Everything the generator needs to draw a new phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Key signature in ABC spelling ("C", "Bb", "F#m", "D dorian").
    #[serde(default = "GenerationSettings::default_key")]
    pub key: String,

    /// Allow chords with more than one pitch.
    #[serde(default)]
    pub harmony: bool,

    /// Title written into the T: field.
    #[serde(default)]
    pub title: String,

    /// Time signature, "4/4" style or "C".
    #[serde(default = "GenerationSettings::default_meter")]
    pub meter: String,

    /// Treble staff.
    #[serde(default = "StaffSettings::default_top")]
    pub top: StaffSettings,

    /// Bass staff.
    #[serde(default = "StaffSettings::default_bottom")]
    pub bottom: StaffSettings,
}

impl GenerationSettings {
    fn default_key() -> String {
        "C".to_string()
    }

    fn default_meter() -> String {
        "4/4".to_string()
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            key: Self::default_key(),
            harmony: false,
            title: String::new(),
            meter: Self::default_meter(),
            top: StaffSettings::default_top(),
            bottom: StaffSettings::default_bottom(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// tracing `EnvFilter` directive.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
