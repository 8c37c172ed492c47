//! SHA-256 digests of generated files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{BuildError, BuildResult};

/// Digest and length of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Lowercase hex SHA-256.
    pub sha256: String,
    /// Size in bytes.
    pub size: u64,
}

/// Streams `path` through SHA-256, returning the hex digest and byte count.
///
/// # Errors
///
/// Returns [`BuildError::FileRead`] if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> BuildResult<FileDigest> {
    let file = File::open(path).map_err(|e| BuildError::file_read(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| BuildError::file_read(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok(FileDigest {
        sha256: hex::encode(hasher.finalize()),
        size,
    })
}
