//! Ownership fixing for a freshly installed tree.
//!
//! The installed tree takes the uid/gid of the directory it was installed
//! into, so a package unpacked by root into a volume owned by an unprivileged
//! user stays usable by that user.

use crate::core::error::Result;
use std::path::Path;

/// Give every entry under `root` the owner of `root`'s parent directory.
///
/// Entries that already match are left alone. Symlinks are changed
/// themselves, never their targets. Returns the number of entries changed.
#[cfg(unix)]
pub fn match_parent_ownership(root: &Path) -> Result<usize> {
    use crate::core::error::{IoResultExt, PackageError};
    use crate::core::output;
    use std::os::unix::fs::{MetadataExt, lchown};

    let parent = super::staging::parent_dir(root);
    let parent_meta = std::fs::metadata(&parent).fs_context("stat", &parent)?;
    let (uid, gid) = (parent_meta.uid(), parent_meta.gid());

    let mut changed = 0;
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            PackageError::io("walk", &path, e.into())
        })?;
        let meta = entry
            .metadata()
            .map_err(|e| PackageError::io("stat", entry.path(), e.into()))?;
        if meta.uid() == uid && meta.gid() == gid {
            continue;
        }
        lchown(entry.path(), Some(uid), Some(gid)).fs_context("chown", entry.path())?;
        changed += 1;
    }

    if changed > 0 {
        output::detail(&format!(
            "changed ownership of {} entries under {} to {}:{}",
            changed,
            root.display(),
            uid,
            gid
        ));
    } else {
        output::debug(&format!(
            "ownership of {} already matches {}:{}",
            root.display(),
            uid,
            gid
        ));
    }

    Ok(changed)
}

#[cfg(not(unix))]
pub fn match_parent_ownership(_root: &Path) -> Result<usize> {
    Ok(0) // No-op on non-Unix
}
