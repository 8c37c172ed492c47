//! Release versions and their PCM status.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{BuildError, BuildResult};

/// Version format the PCM schema accepts: up to three numeric components.
const PCM_VERSION_PATTERN: &str = r"^\d{1,4}(\.\d{1,4}(\.\d{1,6})?)?$";

fn pcm_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PCM_VERSION_PATTERN).expect("version pattern is valid"))
}

/// A release version string.
///
/// Any non-empty string without whitespace is accepted; versions outside the
/// PCM numeric format are allowed but flagged by [`Self::is_pcm_compatible`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidVersion`] for an empty string or one
    /// containing whitespace, path separators or control characters.
    pub fn parse(version: &str) -> BuildResult<Self> {
        if version.trim().is_empty() {
            return Err(BuildError::invalid_version(version, "must not be empty"));
        }
        if version.chars().any(char::is_whitespace) {
            return Err(BuildError::invalid_version(
                version,
                "must not contain whitespace",
            ));
        }
        // The version becomes part of the archive file name.
        if version.contains(['/', '\\']) {
            return Err(BuildError::invalid_version(
                version,
                "must not contain path separators",
            ));
        }
        if version.chars().any(char::is_control) {
            return Err(BuildError::invalid_version(
                version,
                "must not contain control characters",
            ));
        }
        Ok(Self(version.to_string()))
    }

    /// Returns the version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the version matches the numeric format KiCad sorts correctly.
    #[must_use]
    pub fn is_pcm_compatible(&self) -> bool {
        pcm_version_regex().is_match(&self.0)
    }

    /// Git tag the release is published under (`v<version>`).
    #[must_use]
    pub fn tag(&self) -> String {
        format!("v{}", self.0)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stability status of a release, as shown in the PCM client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    /// Ready for general use.
    #[default]
    Stable,
    /// Pre-release.
    Testing,
    /// Work in progress.
    Development,
    /// No longer recommended.
    Deprecated,
}

impl VersionStatus {
    /// Returns the status as it appears in the index.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Testing => "testing",
            Self::Development => "development",
            Self::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
