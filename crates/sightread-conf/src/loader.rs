//! Config file discovery, layered loading, and environment variable overlay.

use crate::{ConfigError, StaffSettings, TrainerConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local). Only returns files
/// that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/sightread/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("sightread/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        let path = expand_path(&path.to_string_lossy());
        if path.exists() {
            files.push(path);
            return files;
        }
    }

    let local = PathBuf::from("sightread.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and lay its values over `config`.
pub fn apply_file(config: &mut TrainerConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Lay the keys present in a TOML document over `config`.
///
/// Keys that are absent leave the current value untouched, so files can
/// be stacked system -> user -> local.
pub fn apply_toml(config: &mut TrainerConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(generation) = table.get("generation").and_then(|v| v.as_table()) {
        let settings = &mut config.generation;
        if let Some(v) = generation.get("key").and_then(|v| v.as_str()) {
            settings.key = v.to_string();
        }
        if let Some(v) = generation.get("harmony").and_then(|v| v.as_bool()) {
            settings.harmony = v;
        }
        if let Some(v) = generation.get("title").and_then(|v| v.as_str()) {
            settings.title = v.to_string();
        }
        if let Some(v) = generation.get("meter").and_then(|v| v.as_str()) {
            settings.meter = v.to_string();
        }
        if let Some(top) = generation.get("top").and_then(|v| v.as_table()) {
            apply_staff(&mut settings.top, top, "generation.top", path)?;
        }
        if let Some(bottom) = generation.get("bottom").and_then(|v| v.as_table()) {
            apply_staff(&mut settings.bottom, bottom, "generation.bottom", path)?;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

fn apply_staff(
    staff: &mut StaffSettings,
    table: &toml::Table,
    section: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let int = |name: &str| -> Result<Option<i64>, ConfigError> {
        match table.get(name) {
            None => Ok(None),
            Some(v) => v.as_integer().map(Some).ok_or_else(|| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("{}.{} must be an integer", section, name),
            }),
        }
    };
    let out_of_range = |name: &str| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{}.{} is out of range", section, name),
    };

    if let Some(v) = int("min_index")? {
        staff.min_index = i32::try_from(v).map_err(|_| out_of_range("min_index"))?;
    }
    if let Some(v) = int("max_index")? {
        staff.max_index = i32::try_from(v).map_err(|_| out_of_range("max_index"))?;
    }
    if let Some(v) = int("note_count")? {
        staff.note_count = u32::try_from(v).map_err(|_| out_of_range("note_count"))?;
    }
    if let Some(v) = table.get("note_value").and_then(|v| v.as_str()) {
        staff.note_value = v.to_string();
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut TrainerConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("SIGHTREAD_KEY") {
        config.generation.key = v;
        sources.env_overrides.push("SIGHTREAD_KEY".to_string());
    }
    if let Ok(v) = env::var("SIGHTREAD_HARMONY") {
        let harmony = match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        };
        if let Some(harmony) = harmony {
            config.generation.harmony = harmony;
            sources.env_overrides.push("SIGHTREAD_HARMONY".to_string());
        }
    }
    if let Ok(v) = env::var("SIGHTREAD_TITLE") {
        config.generation.title = v;
        sources.env_overrides.push("SIGHTREAD_TITLE".to_string());
    }
    if let Ok(v) = env::var("SIGHTREAD_METER") {
        config.generation.meter = v;
        sources.env_overrides.push("SIGHTREAD_METER".to_string());
    }

    if let Ok(v) = env::var("SIGHTREAD_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("SIGHTREAD_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
