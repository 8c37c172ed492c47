//! Error types for package and repository builds.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that can occur while building a PCM repository.
///
/// Every variant is fatal: a build either completes or leaves the output
/// directory as it was.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The metadata file does not exist.
    #[error("Metadata file not found: {path}")]
    MetadataNotFound {
        /// Expected location of the metadata file.
        path: PathBuf,
    },

    /// The metadata file is not valid JSON or lacks required fields.
    #[error("Malformed metadata in {path}")]
    MalformedMetadata {
        /// Path to the metadata file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A metadata field has an unacceptable value.
    #[error("Invalid metadata field '{field}': {message}")]
    InvalidMetadata {
        /// Field name.
        field: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The content directory does not exist.
    #[error("Content directory not found: {path}")]
    ContentNotFound {
        /// Expected location of the content directory.
        path: PathBuf,
    },

    /// The content directory contains no files to package.
    #[error("Content directory is empty: {path}")]
    ContentEmpty {
        /// Path to the content directory.
        path: PathBuf,
    },

    /// The release version is unusable.
    #[error("Invalid version '{version}': {message}")]
    InvalidVersion {
        /// Version as given.
        version: String,
        /// Description of what's wrong.
        message: String,
    },

    /// Failed to read a file or directory.
    #[error("Failed to read {path}")]
    FileRead {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to create, write or move a file or directory.
    #[error("Failed to write {path}")]
    FileWrite {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to traverse the content directory.
    #[error("Failed to walk {path}")]
    Walk {
        /// Directory being traversed.
        path: PathBuf,
        /// Underlying traversal error.
        #[source]
        source: walkdir::Error,
    },

    /// The zip writer reported an error.
    #[error("Failed to write archive {path}")]
    Archive {
        /// Archive being written.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// An index document could not be serialised.
    #[error("Failed to serialise {document}")]
    Serialize {
        /// Name of the document.
        document: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl BuildError {
    /// Creates a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid metadata error.
    pub fn invalid_metadata(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid version error.
    pub fn invalid_version(version: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            message: message.into(),
        }
    }

    /// Creates an archive error.
    pub fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialisation error.
    pub fn serialize(document: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            document: document.into(),
            source,
        }
    }

    /// Returns `true` for errors caused by bad inputs rather than the filesystem.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MetadataNotFound { .. }
                | Self::MalformedMetadata { .. }
                | Self::InvalidMetadata { .. }
                | Self::ContentNotFound { .. }
                | Self::ContentEmpty { .. }
                | Self::InvalidVersion { .. }
        )
    }
}
