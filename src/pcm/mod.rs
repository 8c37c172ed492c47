//! KiCad Plugin and Content Manager packaging.
//!
//! A PCM repository consists of:
//!
//! - Release archives, one zip per package version, holding the library
//!   content plus a `metadata.json` describing the package
//! - `packages.json`, listing every package with its releases, download URLs,
//!   checksums and sizes
//! - `repository.json`, the URL users add to KiCad, which points at
//!   `packages.json` and `resources.zip` and pins their checksums
//!
//! [`RepositoryBuilder`] produces all of them in one pass.

pub mod archive;
pub mod builder;
pub mod checksum;
pub mod error;
pub mod github;
pub mod index;
pub mod metadata;
pub mod version;

pub use builder::{BuildReport, BuildRequest, RepositoryBuilder};
pub use error::{BuildError, BuildResult};
pub use github::GithubRepo;
pub use metadata::PackageMetadata;
pub use version::{ReleaseVersion, VersionStatus};
