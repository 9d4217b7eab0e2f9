//! Staging directories that are promoted into place by rename.
//!
//! A staging directory is a hidden sibling of the target, so the final rename
//! never crosses a filesystem boundary. Dropping an unpromoted `Staging`
//! removes it together with anything extracted so far.

use crate::core::error::{IoResultExt, PackageError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Mode given to a promoted target directory
#[cfg(unix)]
const TARGET_DIR_MODE: u32 = 0o755;

#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    /// Create a fresh staging directory next to `target`.
    pub fn next_to(target: &Path) -> Result<Self> {
        let parent = parent_dir(target);
        std::fs::create_dir_all(&parent).fs_context("create directory", &parent)?;

        let dir = tempfile::Builder::new()
            .prefix(&format!(".{}.staging-", file_name(target)?))
            .tempdir_in(&parent)
            .fs_context("create staging directory in", &parent)?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Rename the staging directory to `target`, which must not exist.
    pub fn promote(self, target: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                self.dir.path(),
                std::fs::Permissions::from_mode(TARGET_DIR_MODE),
            )
            .fs_context("chmod", self.dir.path())?;
        }

        std::fs::rename(self.dir.path(), target).fs_context("promote staging to", target)?;
        // The directory now lives at `target`; nothing is left to clean up.
        let _ = self.dir.keep();
        Ok(())
    }
}

/// Parent of `path`, treating a bare relative name as living in `.`.
pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub(crate) fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            PackageError::configuration(format!("target has no file name: {}", path.display()))
        })
}

/// Hidden sibling that holds the previous tree while `replace` swaps it out.
pub(crate) fn trash_path(target: &Path) -> Result<PathBuf> {
    Ok(parent_dir(target).join(format!(
        ".{}.replaced-{}",
        file_name(target)?,
        std::process::id()
    )))
}
