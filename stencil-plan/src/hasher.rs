//! Content fingerprinting for version directories.
//!
//! Every regular file under the root is visited depth-first, with the entries
//! of each directory sorted by file name, and its bytes are streamed into one
//! SHA-256 digest. File names and metadata (mtime, mode) are not inputs, so
//! two trees with the same file contents in the same order hash identically.

use std::fs::File;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use stencil_core::ContentHash;

use crate::error::{hash_err, PlanError};

/// Regular files under `root` in hashing order. Symlinks are not followed.
pub fn content_files(root: &Path) -> Result<Vec<PathBuf>, PlanError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            hash_err(path, e.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Fingerprint the directory at `root`.
///
/// Any I/O failure aborts; a partial digest is never returned.
pub fn hash_directory(root: &Path) -> Result<ContentHash, PlanError> {
    let mut hasher = Sha256::new();
    for path in content_files(root)? {
        let mut file = File::open(&path).map_err(|e| hash_err(&path, e))?;
        std::io::copy(&mut file, &mut hasher).map_err(|e| hash_err(&path, e))?;
    }
    let digest = hex::encode(hasher.finalize());
    tracing::debug!(root = %root.display(), %digest, "hashed version directory");
    Ok(ContentHash(digest))
}
