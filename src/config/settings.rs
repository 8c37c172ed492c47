//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Library content directory, relative to the project root.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Base package metadata file, relative to the project root.
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Optional 64x64 package icon, relative to the project root.
    #[serde(default = "default_icon_path")]
    pub icon_path: PathBuf,

    /// Output directory, relative to the project root. Replaced on every build.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,

    /// Branch the index files are served from.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Minimum KiCad version when the metadata does not name one.
    #[serde(default = "default_kicad_version")]
    pub kicad_version: String,

    /// Display name of the repository. Default: `"<repo> PCM repository"`.
    #[serde(default)]
    pub repository_name: Option<String>,

    /// Glob patterns (relative to the content directory) left out of the archive.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            content_dir: default_content_dir(),
            metadata_path: default_metadata_path(),
            icon_path: default_icon_path(),
            dist_dir: default_dist_dir(),
            branch: default_branch(),
            kicad_version: default_kicad_version(),
            repository_name: None,
            exclude: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branch.trim().is_empty() {
            return Err(ConfigError::invalid("branch must not be empty"));
        }

        if self.kicad_version.trim().is_empty() {
            return Err(ConfigError::invalid("kicad_version must not be empty"));
        }

        // dist_dir is wiped on every build, so it must name a real subdirectory.
        if !names_subdirectory(&self.dist_dir) {
            return Err(ConfigError::invalid(format!(
                "dist_dir '{}' must be a relative subdirectory of the project root",
                self.dist_dir.display()
            )));
        }

        // Overlapping directories would package previous build output.
        let dist = normalise(&self.dist_dir);
        let content = normalise(&self.content_dir);
        if dist.starts_with(&content) || content.starts_with(&dist) {
            return Err(ConfigError::invalid(format!(
                "dist_dir '{}' and content_dir '{}' must not contain one another",
                self.dist_dir.display(),
                self.content_dir.display()
            )));
        }

        self.exclude_patterns().map(|_| ())
    }

    /// Compiles the `exclude` globs.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first pattern that does not compile.
    pub fn exclude_patterns(&self) -> Result<Vec<glob::Pattern>, ConfigError> {
        self.exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    ConfigError::invalid(format!("invalid exclude pattern '{p}': {e}"))
                })
            })
            .collect()
    }
}

fn names_subdirectory(path: &Path) -> bool {
    let mut normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal = true,
            Component::CurDir => {}
            _ => return false,
        }
    }
    normal
}

/// Drops `.` components so `./lib` and `lib/` compare equal.
fn normalise(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("lib-content")
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("pcm/metadata.base.json")
}

fn default_icon_path() -> PathBuf {
    PathBuf::from("pcm/icon.png")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_kicad_version() -> String {
    "8.0".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
