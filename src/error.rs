//! Error taxonomy.
//!
//! Two families, both fatal:
//!
//! - [`ConfigError`]: the optional `build.json` could not be loaded or holds
//!   unusable values. Raised before any input is read.
//! - [`BuildError`]: input validation (metadata, content, version) or a
//!   filesystem failure while producing the outputs. See
//!   [`BuildError::is_input_error`].

use std::path::PathBuf;

use thiserror::Error;

pub use crate::pcm::error::{BuildError, BuildResult};

/// Errors raised while loading the build configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("build configuration not found: {path}")]
    Missing {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("cannot read build configuration {path}")]
    Unreadable {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON or has unknown fields.
    #[error("malformed build configuration {path}")]
    Malformed {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid build configuration: {message}")]
    Invalid {
        /// Which setting is wrong and why.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid setting error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
