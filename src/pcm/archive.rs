//! Deterministic zip archives.
//!
//! The same entries always produce the same bytes: entries are sorted by
//! name, timestamps are pinned to the zip epoch (1980-01-01) and permissions
//! are fixed. Only regular files are stored; directories are implied by the
//! entry names.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::error::{BuildError, BuildResult};

/// Permission bits recorded for every entry.
const ENTRY_MODE: u32 = 0o644;

/// A regular file found under the content directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    /// Path relative to the content directory, `/`-separated.
    pub relative: String,
    /// Absolute (or root-relative) path on disk.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Where an entry's bytes come from.
#[derive(Debug, Clone)]
pub enum EntrySource {
    /// Copied from a file on disk.
    File(PathBuf),
    /// Generated in memory.
    Bytes(Vec<u8>),
}

/// One file inside an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Name inside the archive, `/`-separated.
    pub name: String,
    /// Entry contents.
    pub source: EntrySource,
}

impl ArchiveEntry {
    /// Entry backed by a file on disk.
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: EntrySource::File(path.into()),
        }
    }

    /// Entry backed by generated bytes.
    pub fn bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: EntrySource::Bytes(bytes.into()),
        }
    }
}

/// Lists every regular file below `dir`, sorted by relative path.
///
/// Files whose relative path matches one of `exclude` are skipped. Symlinks
/// are followed.
///
/// # Errors
///
/// Returns [`BuildError::ContentNotFound`] if `dir` is not a directory,
/// [`BuildError::ContentEmpty`] if no files remain, or a traversal error.
pub fn collect_content(dir: &Path, exclude: &[glob::Pattern]) -> BuildResult<Vec<ContentFile>> {
    if !dir.is_dir() {
        return Err(BuildError::ContentNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| BuildError::Walk {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_name(dir, entry.path());
        if exclude.iter().any(|p| p.matches(&relative)) {
            tracing::debug!(file = %relative, "Excluded from archive");
            continue;
        }

        let size = entry
            .metadata()
            .map_err(|e| BuildError::Walk {
                path: dir.to_path_buf(),
                source: e,
            })?
            .len();

        files.push(ContentFile {
            relative,
            path: entry.path().to_path_buf(),
            size,
        });
    }

    if files.is_empty() {
        return Err(BuildError::ContentEmpty {
            path: dir.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Writes `entries` to a new zip file at `out`, returning its size in bytes.
///
/// Entries are sorted by name first, so callers may pass them in any order.
/// An empty entry list produces a valid empty archive.
///
/// # Errors
///
/// Returns an error if the output cannot be created, a source file cannot be
/// read, or the zip writer fails.
pub fn write_archive(out: &Path, mut entries: Vec<ArchiveEntry>) -> BuildResult<u64> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let file = File::create(out).map_err(|e| BuildError::file_write(out, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(ENTRY_MODE);

    for entry in &entries {
        zip.start_file(entry.name.as_str(), options)
            .map_err(|e| BuildError::archive(out, e))?;
        match &entry.source {
            EntrySource::File(path) => {
                let mut src = File::open(path).map_err(|e| BuildError::file_read(path, e))?;
                std::io::copy(&mut src, &mut zip).map_err(|e| BuildError::file_write(out, e))?;
            }
            EntrySource::Bytes(bytes) => {
                zip.write_all(bytes)
                    .map_err(|e| BuildError::file_write(out, e))?;
            }
        }
    }

    let mut writer = zip.finish().map_err(|e| BuildError::archive(out, e))?;
    writer.flush().map_err(|e| BuildError::file_write(out, e))?;
    drop(writer);

    let size = std::fs::metadata(out)
        .map_err(|e| BuildError::file_read(out, e))?
        .len();
    tracing::debug!(archive = %out.display(), entries = entries.len(), size, "Archive written");
    Ok(size)
}
