//! Build configuration loading and parsing.
//!
//! Configuration is optional. Without a file, every setting falls back to the
//! conventional repository layout (`lib-content/`, `pcm/metadata.base.json`,
//! `dist/`).
//!
//! # Configuration File Locations
//!
//! 1. Path specified via `--config` CLI flag (must exist)
//! 2. `<root>/pcm/build.json`, used only when present

mod settings;

pub use settings::{Config, LoggingConfig};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Location of the optional configuration file, relative to the project root.
pub const DEFAULT_CONFIG_FILE: &str = "pcm/build.json";

/// Returns the default configuration file path for a project root.
#[must_use]
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE)
}

/// Loads and validates the build configuration.
///
/// If `path` is `None`, `<root>/pcm/build.json` is used when it exists and
/// defaults are returned otherwise.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed or contains unknown fields
/// - Validation of the parsed values fails
pub fn load_config(root: &Path, path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::Missing {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => {
            let p = default_config_path(root);
            if !p.exists() {
                tracing::debug!(path = %p.display(), "No build configuration, using defaults");
                return Ok(Config::default());
            }
            p
        }
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Unreadable {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::Malformed {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
