//! Minimal configuration loading for the sightread trainer.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sightread_conf::TrainerConfig;
//!
//! let config = TrainerConfig::load().expect("Failed to load config");
//! println!("key: {}", config.generation.key);
//! println!("top staff: {:?}", config.generation.top);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/sightread/config.toml` (system)
//! 2. `~/.config/sightread/config.toml` (user)
//! 3. `./sightread.toml` (local override, replaced by `--config`)
//! 4. Environment variables (`SIGHTREAD_*`, `RUST_LOG`)
//!
//! Each layer only overrides the keys it actually sets.
//!
//! # Example Config
//!
//! ```toml
//! [generation]
//! key = "G"
//! harmony = true
//! meter = "4/4"
//!
//! [generation.top]
//! min_index = 0
//! max_index = 11
//! note_count = 4
//! note_value = "quarter"
//!
//! [generation.bottom]
//! min_index = -11
//! max_index = 0
//! note_count = 2
//! note_value = "half"
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod generation;
pub mod loader;

pub use generation::{GenerationSettings, StaffSettings, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete trainer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrainerConfig {
    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TrainerConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` stand in for `./sightread.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = TrainerConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::apply_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();
        let generation = &self.generation;

        output.push_str("# sightread configuration\n\n");

        output.push_str("[generation]\n");
        output.push_str(&format!("key = {}\n", quoted(&generation.key)));
        output.push_str(&format!("harmony = {}\n", generation.harmony));
        output.push_str(&format!("title = {}\n", quoted(&generation.title)));
        output.push_str(&format!("meter = {}\n", quoted(&generation.meter)));

        for (name, staff) in [("top", &generation.top), ("bottom", &generation.bottom)] {
            output.push_str(&format!("\n[generation.{}]\n", name));
            output.push_str(&format!("min_index = {}\n", staff.min_index));
            output.push_str(&format!("max_index = {}\n", staff.max_index));
            output.push_str(&format!("note_count = {}\n", staff.note_count));
            output.push_str(&format!("note_value = {}\n", quoted(&staff.note_value)));
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = {}\n", quoted(&self.telemetry.log_level)));

        output
    }
}

/// A TOML string literal with quotes, backslashes and control characters escaped.
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
