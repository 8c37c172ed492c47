//! Repository build: content + metadata in, release archive and indexes out.
//!
//! # Output layout
//!
//! ```text
//! dist/
//! ├── releases/<identifier>_v<version>_pcm.zip
//! ├── packages.json
//! ├── repository.json
//! └── resources.zip
//! ```
//!
//! All inputs are validated before anything is written. The new `dist/` is
//! assembled in a hidden staging directory beside it and swapped in at the
//! end, so a failed build leaves the previous output untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ConfigError;

use super::archive::{collect_content, write_archive, ArchiveEntry, ContentFile};
use super::checksum::{sha256_file, FileDigest};
use super::error::{BuildError, BuildResult};
use super::github::GithubRepo;
use super::index::{
    to_json_bytes, IndexRef, Package, PackageVersion, PackagesIndex, RepositoryIndex, UpdateTime,
};
use super::metadata::PackageMetadata;
use super::version::{ReleaseVersion, VersionStatus};

/// Name of the generated metadata file inside the package archive.
pub const PACKAGE_METADATA_FILE: &str = "metadata.json";

/// Location of the icon inside the package archive.
pub const PACKAGE_ICON_ENTRY: &str = "resources/icon.png";

/// Subdirectory of the output directory holding release archives.
pub const RELEASES_DIR: &str = "releases";

/// Packages index file name.
pub const PACKAGES_FILE: &str = "packages.json";

/// Repository index file name.
pub const REPOSITORY_FILE: &str = "repository.json";

/// Resources archive file name.
pub const RESOURCES_FILE: &str = "resources.zip";

/// Parameters of a single build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Project root that configured paths are relative to.
    pub root: PathBuf,
    /// Version being released.
    pub version: ReleaseVersion,
    /// Status of the release.
    pub status: VersionStatus,
    /// Where the repository is published.
    pub github: GithubRepo,
    /// Keep other releases listed in the existing `packages.json`.
    pub append: bool,
}

/// What a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Path of the release archive.
    pub archive_path: PathBuf,
    /// Checksum and size of the release archive.
    pub archive: FileDigest,
    /// Total size of the packaged content.
    pub install_size: u64,
    /// Path of `packages.json`.
    pub packages_path: PathBuf,
    /// Path of `repository.json`.
    pub repository_path: PathBuf,
    /// URL the archive must be uploaded to.
    pub download_url: String,
    /// URL to add to KiCad's PCM repository list.
    pub repository_url: String,
    /// Number of releases listed in `packages.json`.
    pub release_count: usize,
}

/// Builds a PCM repository from the configured project layout.
#[derive(Debug)]
pub struct RepositoryBuilder {
    config: Config,
    exclude: Vec<glob::Pattern>,
}

impl RepositoryBuilder {
    /// Creates a builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let exclude = config.exclude_patterns()?;
        Ok(Self { config, exclude })
    }

    /// Runs a build stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::build_at`].
    pub fn build(&self, request: &BuildRequest) -> BuildResult<BuildReport> {
        self.build_at(request, Utc::now())
    }

    /// Runs a build, stamping the repository index with `now`.
    ///
    /// # Errors
    ///
    /// Returns an input error for missing or invalid metadata or content, and
    /// a filesystem error if any output cannot be written. On error the
    /// output directory is left as it was.
    pub fn build_at(&self, request: &BuildRequest, now: DateTime<Utc>) -> BuildResult<BuildReport> {
        let root = &request.root;
        let metadata_path = root.join(&self.config.metadata_path);
        let content_dir = root.join(&self.config.content_dir);
        let icon_path = root.join(&self.config.icon_path);
        let dist_dir = root.join(&self.config.dist_dir);

        let metadata = PackageMetadata::load(&metadata_path)?;
        let content = collect_content(&content_dir, &self.exclude)?;
        let icon = icon_path.is_file().then_some(icon_path);

        if !request.version.is_pcm_compatible() {
            warn!(
                version = %request.version,
                "Version is not in the numeric MAJOR[.MINOR[.PATCH]] form KiCad expects"
            );
        }

        let previous = if request.append {
            previous_versions(&dist_dir, &metadata, &request.version)?
        } else {
            Vec::new()
        };

        info!(
            identifier = %metadata.identifier,
            version = %request.version,
            files = content.len(),
            "Building package"
        );

        let dist_parent = dist_dir.parent().unwrap_or(root);
        fs::create_dir_all(dist_parent).map_err(|e| BuildError::file_write(dist_parent, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".pcm-build-")
            .tempdir_in(dist_parent)
            .map_err(|e| BuildError::file_write(dist_parent, e))?;

        let kicad_version = metadata
            .kicad_version
            .clone()
            .unwrap_or_else(|| self.config.kicad_version.clone());
        let filename = metadata.archive_filename(&request.version);
        let download_url = request.github.release_asset_url(&request.version, &filename);

        // Package archive
        let releases_dir = staging.path().join(RELEASES_DIR);
        fs::create_dir_all(&releases_dir).map_err(|e| BuildError::file_write(&releases_dir, e))?;
        let staged_archive = releases_dir.join(&filename);

        let archive_metadata = Package {
            metadata: metadata.clone(),
            versions: vec![PackageVersion::new(
                request.version.clone(),
                request.status,
                kicad_version.clone(),
            )],
        };
        let (entries, install_size) = package_entries(
            &content,
            to_json_bytes(&archive_metadata, PACKAGE_METADATA_FILE)?,
            icon.as_deref(),
        );
        write_archive(&staged_archive, entries)?;
        let archive = sha256_file(&staged_archive)?;

        // packages.json
        let mut versions = vec![PackageVersion::new(
            request.version.clone(),
            request.status,
            kicad_version,
        )
        .with_download(
            download_url.clone(),
            archive.sha256.clone(),
            archive.size,
            install_size,
        )];
        versions.extend(previous);
        let release_count = versions.len();

        let packages = PackagesIndex {
            packages: vec![Package {
                metadata: metadata.clone(),
                versions,
            }],
        };
        let staged_packages = staging.path().join(PACKAGES_FILE);
        write_file(&staged_packages, &to_json_bytes(&packages, PACKAGES_FILE)?)?;

        // resources.zip
        let staged_resources = staging.path().join(RESOURCES_FILE);
        let resource_entries = icon
            .iter()
            .map(|p| ArchiveEntry::file(format!("{}/icon.png", metadata.identifier), p.clone()))
            .collect();
        write_archive(&staged_resources, resource_entries)?;

        // repository.json
        let dist_url_prefix = url_path(&self.config.dist_dir);
        let time = UpdateTime::from(now);
        let mut repository = RepositoryIndex::new(
            self.repository_name(&request.github),
            metadata.maintainer_or_author().clone(),
            IndexRef::new(
                request
                    .github
                    .raw_url(&format!("{dist_url_prefix}/{PACKAGES_FILE}")),
                sha256_file(&staged_packages)?.sha256,
                &time,
            ),
        );
        repository.resources = Some(IndexRef::new(
            request
                .github
                .raw_url(&format!("{dist_url_prefix}/{RESOURCES_FILE}")),
            sha256_file(&staged_resources)?.sha256,
            &time,
        ));
        write_file(
            &staging.path().join(REPOSITORY_FILE),
            &to_json_bytes(&repository, REPOSITORY_FILE)?,
        )?;

        replace_dir(staging.path(), &dist_dir, dist_parent)?;

        let report = BuildReport {
            archive_path: dist_dir.join(RELEASES_DIR).join(&filename),
            archive,
            install_size,
            packages_path: dist_dir.join(PACKAGES_FILE),
            repository_path: dist_dir.join(REPOSITORY_FILE),
            download_url,
            repository_url: request
                .github
                .raw_url(&format!("{dist_url_prefix}/{REPOSITORY_FILE}")),
            release_count,
        };

        info!(
            archive = %report.archive_path.display(),
            sha256 = %report.archive.sha256,
            download_size = report.archive.size,
            install_size = report.install_size,
            releases = report.release_count,
            "Repository built"
        );

        Ok(report)
    }

    fn repository_name(&self, github: &GithubRepo) -> String {
        self.config
            .repository_name
            .clone()
            .unwrap_or_else(|| format!("{} PCM repository", github.repo))
    }
}

/// Releases of the package already listed in the output directory.
fn previous_versions(
    dist_dir: &Path,
    metadata: &PackageMetadata,
    version: &ReleaseVersion,
) -> BuildResult<Vec<PackageVersion>> {
    let path = dist_dir.join(PACKAGES_FILE);
    let Some(existing) = PackagesIndex::load_existing(&path)? else {
        debug!(path = %path.display(), "No previous packages index to append to");
        return Ok(Vec::new());
    };

    let kept = existing.other_versions(&metadata.identifier, version);
    if kept.is_empty()
        && existing
            .packages
            .iter()
            .all(|p| p.metadata.identifier != metadata.identifier)
    {
        warn!(
            identifier = %metadata.identifier,
            "Previous packages index has no entry for this package; nothing appended"
        );
    }
    debug!(count = kept.len(), "Carrying over previous releases");
    Ok(kept)
}

/// Archive entries for the package and the installed content size.
///
/// Generated files win over content files with the same name.
fn package_entries(
    content: &[ContentFile],
    metadata_json: Vec<u8>,
    icon: Option<&Path>,
) -> (Vec<ArchiveEntry>, u64) {
    let mut entries: BTreeMap<String, (ArchiveEntry, u64)> = content
        .iter()
        .map(|f| {
            (
                f.relative.clone(),
                (ArchiveEntry::file(f.relative.clone(), f.path.clone()), f.size),
            )
        })
        .collect();

    let mut generated = vec![ArchiveEntry::bytes(PACKAGE_METADATA_FILE, metadata_json)];
    if let Some(icon) = icon {
        generated.push(ArchiveEntry::file(PACKAGE_ICON_ENTRY, icon));
    }
    for entry in generated {
        if entries.contains_key(&entry.name) {
            warn!(file = %entry.name, "Content file replaced by generated file");
        }
        entries.insert(entry.name.clone(), (entry, 0));
    }

    let install_size = entries.values().map(|(_, size)| size).sum();
    (entries.into_values().map(|(entry, _)| entry).collect(), install_size)
}

/// Joins the normal components of a relative path with `/`.
fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn write_file(path: &Path, bytes: &[u8]) -> BuildResult<()> {
    fs::write(path, bytes).map_err(|e| BuildError::file_write(path, e))
}

/// Moves `staged` to `target`, replacing whatever was there.
///
/// The old directory is parked in a scratch directory under `parent` until
/// the new one is in place and restored if the final rename fails.
fn replace_dir(staged: &Path, target: &Path, parent: &Path) -> BuildResult<()> {
    let trash = tempfile::Builder::new()
        .prefix(".pcm-old-")
        .tempdir_in(parent)
        .map_err(|e| BuildError::file_write(parent, e))?;
    let parked = trash.path().join("previous");

    let had_previous = target.exists();
    if had_previous {
        fs::rename(target, &parked).map_err(|e| BuildError::file_write(target, e))?;
    }

    if let Err(e) = fs::rename(staged, target) {
        if had_previous {
            if let Err(restore) = fs::rename(&parked, target) {
                warn!(error = %restore, path = %target.display(), "Failed to restore previous output");
            }
        }
        return Err(BuildError::file_write(target, e));
    }

    Ok(())
}
