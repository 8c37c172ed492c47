//! Packages and repository index documents.
//!
//! `packages.json` lists packages and their releases; `repository.json` is the
//! entry point the PCM client is pointed at and references `packages.json`
//! (and `resources.zip`) by URL and checksum.

use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{BuildError, BuildResult};
use super::metadata::{PackageMetadata, Person};
use super::version::{ReleaseVersion, VersionStatus};

/// JSON schema reference written into `repository.json`.
pub const REPOSITORY_SCHEMA: &str = "https://gitlab.com/kicad/code/kicad/-/raw/master/\
                                     kicad/pcm/schemas/pcm.v1.schema.json#/definitions/Repository";

/// Format of `update_time_utc`.
const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One release of a package.
///
/// The copy embedded in the package archive carries no download fields; the
/// copy in `packages.json` has all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageVersion {
    /// Release version.
    pub version: ReleaseVersion,
    /// Release status.
    pub status: VersionStatus,
    /// Minimum supported KiCad version.
    pub kicad_version: String,
    /// SHA-256 of the release archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_sha256: Option<String>,
    /// Where the PCM client downloads the archive from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Archive size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size: Option<u64>,
    /// Unpacked content size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_size: Option<u64>,
    /// Fields written by other tools (e.g. `kicad_version_max`).
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl PackageVersion {
    /// A release entry without download information.
    pub fn new(version: ReleaseVersion, status: VersionStatus, kicad_version: impl Into<String>) -> Self {
        Self {
            version,
            status,
            kicad_version: kicad_version.into(),
            download_sha256: None,
            download_url: None,
            download_size: None,
            install_size: None,
            extra: IndexMap::new(),
        }
    }

    /// Adds the download information of a built archive.
    #[must_use]
    pub fn with_download(
        mut self,
        url: impl Into<String>,
        sha256: impl Into<String>,
        download_size: u64,
        install_size: u64,
    ) -> Self {
        self.download_url = Some(url.into());
        self.download_sha256 = Some(sha256.into());
        self.download_size = Some(download_size);
        self.install_size = Some(install_size);
        self
    }
}

/// A package: its metadata plus its releases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Descriptive metadata.
    #[serde(flatten)]
    pub metadata: PackageMetadata,
    /// Releases, newest first.
    pub versions: Vec<PackageVersion>,
}

/// Contents of `packages.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagesIndex {
    /// Packages published by the repository.
    pub packages: Vec<Package>,
}

impl PackagesIndex {
    /// Reads a previously generated `packages.json`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_existing(path: &Path) -> BuildResult<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(path).map_err(|e| BuildError::file_read(path, e))?;
        let index = serde_json::from_str(&contents).map_err(|e| BuildError::MalformedMetadata {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Some(index))
    }

    /// Releases of `identifier` other than `version`.
    #[must_use]
    pub fn other_versions(&self, identifier: &str, version: &ReleaseVersion) -> Vec<PackageVersion> {
        self.packages
            .iter()
            .filter(|p| p.metadata.identifier == identifier)
            .flat_map(|p| p.versions.iter())
            .filter(|v| &v.version != version)
            .cloned()
            .collect()
    }
}

/// Timestamp pair used by index references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTime {
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub utc: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl From<DateTime<Utc>> for UpdateTime {
    fn from(time: DateTime<Utc>) -> Self {
        Self {
            utc: time.format(UPDATE_TIME_FORMAT).to_string(),
            timestamp: time.timestamp(),
        }
    }
}

/// Reference from `repository.json` to another published file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRef {
    /// Where the file is served.
    pub url: String,
    /// SHA-256 of the file.
    pub sha256: String,
    /// Last update, formatted.
    pub update_time_utc: String,
    /// Last update, Unix seconds.
    pub update_timestamp: i64,
}

impl IndexRef {
    /// Creates a reference stamped with `time`.
    pub fn new(url: impl Into<String>, sha256: impl Into<String>, time: &UpdateTime) -> Self {
        Self {
            url: url.into(),
            sha256: sha256.into(),
            update_time_utc: time.utc.clone(),
            update_timestamp: time.timestamp,
        }
    }
}

/// Contents of `repository.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIndex {
    /// Schema reference.
    #[serde(rename = "$schema")]
    pub schema: String,
    /// Repository display name.
    pub name: String,
    /// Repository maintainer.
    pub maintainer: Person,
    /// The packages index.
    pub packages: IndexRef,
    /// The resources archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<IndexRef>,
}

impl RepositoryIndex {
    /// Creates a repository index.
    pub fn new(name: impl Into<String>, maintainer: Person, packages: IndexRef) -> Self {
        Self {
            schema: REPOSITORY_SCHEMA.to_string(),
            name: name.into(),
            maintainer,
            packages,
            resources: None,
        }
    }
}

/// Pretty-prints `value` with a two-space indent and a trailing newline.
///
/// # Errors
///
/// Returns [`BuildError::Serialize`] if serialisation fails.
pub fn to_json_bytes<T: Serialize>(value: &T, document: &str) -> BuildResult<Vec<u8>> {
    let mut bytes =
        serde_json::to_vec_pretty(value).map_err(|e| BuildError::serialize(document, e))?;
    bytes.push(b'\n');
    Ok(bytes)
}
