//! Tar bundles uploaded as the source of a new version.

use std::fs::File;
use std::path::Path;

use tar::Header;

use stencil_plan::content_files;

use crate::error::{bundle_err, ApplyError};

/// Archive the regular files under `root`, in hashing order, with paths
/// relative to `root`. Ownership and timestamps are zeroed so equal trees
/// produce equal bundles.
pub fn archive_dir(root: &Path) -> Result<Vec<u8>, ApplyError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);

    for path in content_files(root)? {
        let rel = path
            .strip_prefix(root)
            .map_err(|e| bundle_err(&path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let file = File::open(&path).map_err(|e| bundle_err(&path, e))?;
        let metadata = file.metadata().map_err(|e| bundle_err(&path, e))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(0o644);
        header.set_size(metadata.len());
        builder
            .append_data(&mut header, rel, file)
            .map_err(|e| bundle_err(&path, e))?;
    }

    let bytes = builder.into_inner().map_err(|e| bundle_err(root, e))?;
    tracing::debug!(root = %root.display(), bytes = bytes.len(), "bundled version directory");
    Ok(bytes)
}
