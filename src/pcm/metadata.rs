//! Package metadata as read from `metadata.base.json`.
//!
//! The base file holds everything about the package except its releases.
//! Fields the builder does not interpret are kept in [`PackageMetadata::extra`]
//! and written back unchanged, in their original order.

use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{BuildError, BuildResult};
use super::version::ReleaseVersion;

/// Identifier format required by the PCM schema.
const IDENTIFIER_PATTERN: &str = r"^[a-zA-Z][-a-zA-Z0-9._]{0,98}[a-zA-Z0-9]$";

/// Longest short description the PCM client accepts.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Longest package name the PCM client accepts.
pub const MAX_NAME_LEN: usize = 200;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is valid"))
}

/// Kind of content a package provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// Python action plugin.
    Plugin,
    /// Symbol, footprint and 3D model libraries.
    #[default]
    Library,
    /// Colour theme.
    Colortheme,
    /// Font files.
    Fonts,
}

/// Author or maintainer entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Display name.
    pub name: String,
    /// Contact channels, e.g. `"github"` or `"email"`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub contact: IndexMap<String, String>,
}

/// Descriptive package metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Human readable package name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Long description shown on the package page.
    pub description_full: String,
    /// Reverse-domain unique package identifier.
    pub identifier: String,
    /// Package kind.
    #[serde(rename = "type", default)]
    pub package_type: PackageType,
    /// Package author.
    pub author: Person,
    /// Package maintainer, if different from the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<Person>,
    /// SPDX license identifier.
    pub license: String,
    /// Links such as `homepage`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub resources: IndexMap<String, String>,
    /// Minimum KiCad version. Build input only, never written back.
    #[serde(default, skip_serializing)]
    pub kicad_version: Option<String>,
    /// Every other field, passed through verbatim.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl PackageMetadata {
    /// Reads and validates a metadata file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, not valid JSON,
    /// lacks a required field or fails [`Self::validate`].
    pub fn load(path: &Path) -> BuildResult<Self> {
        if !path.is_file() {
            return Err(BuildError::MetadataNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| BuildError::file_read(path, e))?;
        let mut metadata: Self =
            serde_json::from_str(&contents).map_err(|e| BuildError::MalformedMetadata {
                path: path.to_path_buf(),
                source: e,
            })?;

        if metadata.extra.shift_remove("versions").is_some() {
            tracing::warn!(
                path = %path.display(),
                "Ignoring 'versions' in base metadata; releases are generated by the build"
            );
        }

        metadata.validate()?;
        Ok(metadata)
    }

    /// Checks required fields and the identifier format.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidMetadata`] naming the first bad field.
    pub fn validate(&self) -> BuildResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.description),
            ("description_full", &self.description_full),
            ("identifier", &self.identifier),
            ("license", &self.license),
            ("author.name", &self.author.name),
        ] {
            if value.trim().is_empty() {
                return Err(BuildError::invalid_metadata(field, "must not be empty"));
            }
        }

        if let Some(maintainer) = &self.maintainer {
            if maintainer.name.trim().is_empty() {
                return Err(BuildError::invalid_metadata(
                    "maintainer.name",
                    "must not be empty",
                ));
            }
        }

        if !identifier_regex().is_match(&self.identifier) {
            return Err(BuildError::invalid_metadata(
                "identifier",
                format!(
                    "'{}' must be 2-100 characters of letters, digits, '.', '-' or '_', \
                     starting with a letter and ending with a letter or digit",
                    self.identifier
                ),
            ));
        }

        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(BuildError::invalid_metadata(
                "name",
                format!("longer than {MAX_NAME_LEN} characters"),
            ));
        }

        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(BuildError::invalid_metadata(
                "description",
                format!("longer than {MAX_DESCRIPTION_LEN} characters"),
            ));
        }

        if let Some(kicad_version) = &self.kicad_version {
            if kicad_version.trim().is_empty() {
                return Err(BuildError::invalid_metadata(
                    "kicad_version",
                    "must not be empty",
                ));
            }
        }

        Ok(())
    }

    /// File name of the release archive for `version`.
    #[must_use]
    pub fn archive_filename(&self, version: &ReleaseVersion) -> String {
        format!("{}_v{}_pcm.zip", self.identifier, version)
    }

    /// The maintainer, falling back to the author.
    #[must_use]
    pub fn maintainer_or_author(&self) -> &Person {
        self.maintainer.as_ref().unwrap_or(&self.author)
    }
}
