//! Persistence layer for console configuration.
//!
//! Provides RON-based save/load for [`ConsoleConfig`].

use std::fs;
use std::path::Path;

use bevy::prelude::*;
use thiserror::Error;

use crate::core::ConsoleConfig;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "netconsole.ron";

/// Errors that can occur during config operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error (path, message).
    #[error("IO error for '{0}': {1}")]
    Io(String, String),
    /// Parse error (path, message).
    #[error("Parse error for '{0}': {1}")]
    Parse(String, String),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Load config from a RON file. Missing fields take their defaults.
pub fn load(path: impl AsRef<Path>) -> Result<ConsoleConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;

    ron::from_str(&contents)
        .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
}

/// Load config from file, returning default if it is missing or invalid.
pub fn load_or_default(path: impl AsRef<Path>) -> ConsoleConfig {
    load(path).unwrap_or_default()
}

/// Save config to a RON file.
pub fn save(config: &ConsoleConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();

    // Create parent directories if needed
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(parent.display().to_string(), e.to_string()))?;
        }
    }

    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(2)
        .enumerate_arrays(false);

    let contents = ron::ser::to_string_pretty(config, pretty)
        .map_err(|e| ConfigError::Serialize(e.to_string()))?;

    fs::write(path, contents)
        .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))
}

/// Resource tracking the config file path.
#[derive(Resource, Debug, Clone)]
pub struct ConfigPath(pub String);

impl Default for ConfigPath {
    fn default() -> Self {
        Self(DEFAULT_CONFIG_FILE.to_string())
    }
}

/// System to load config on startup.
pub fn load_config_on_startup(mut config: ResMut<ConsoleConfig>, config_path: Res<ConfigPath>) {
    let path = &config_path.0;

    if !Path::new(path).exists() {
        info!("No config file found at '{}', using defaults", path);
        return;
    }

    match load(path) {
        Ok(loaded) => {
            info!("Loaded console config from '{}'", path);
            debug!("Console config: {:?}", loaded);
            *config = loaded;
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
        }
    }
}
