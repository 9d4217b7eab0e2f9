//! Package installer - moves a target directory between absent and installed.
//!
//! ```text
//! absent            --install--> installed
//! installed         --install--> installed (+ backup)
//! installed         --replace--> installed (no backup)
//! absent|installed  --delete-->  absent
//! ```
//!
//! Archives are always unpacked into a staging sibling first and promoted by
//! rename, so a failed extraction never touches the target or its backup.

mod ownership;
mod staging;

pub use ownership::match_parent_ownership;
pub use staging::Staging;

use crate::archive;
use crate::core::error::{IoResultExt, PackageError, Result};
use crate::core::output;
use crate::core::version::{self, BuildVersion, VERSION_MARKER};
use std::cmp::Ordering;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Observable state of a target path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Absent,
    Installed,
    /// Something other than a directory sits at the target path
    NotADirectory,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Installed => write!(f, "installed"),
            Self::NotADirectory => write!(f, "not a directory"),
        }
    }
}

/// Outcome of an `install` or `replace`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub previous: TargetState,
    pub previous_version: Option<String>,
    /// Where the previous tree went, if it was kept
    pub backup: Option<PathBuf>,
    /// Version of the newly installed tree, if its marker is readable
    pub version: Option<String>,
}

/// Installs, replaces and deletes one target directory.
#[derive(Debug, Clone)]
pub struct Installer {
    target: PathBuf,
    marker: PathBuf,
}

impl Installer {
    /// Create an installer for `target` using the standard version marker.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            marker: PathBuf::from(VERSION_MARKER),
        }
    }

    /// Use a different version marker, relative to the package root.
    pub fn with_version_marker(mut self, marker: impl Into<PathBuf>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Current state of the target path. Symlinks are not followed.
    ///
    /// Only a missing path counts as absent; any other stat failure
    /// (permission denied, symlink loop) is an error.
    pub fn state(&self) -> Result<TargetState> {
        match std::fs::symlink_metadata(&self.target) {
            Ok(md) if md.is_dir() => Ok(TargetState::Installed),
            Ok(_) => Ok(TargetState::NotADirectory),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(TargetState::Absent),
            Err(e) => Err(PackageError::io("stat", &self.target, e)),
        }
    }

    /// Version recorded in the installed tree.
    pub fn installed_version(&self) -> Result<BuildVersion> {
        BuildVersion::read_from_dir(&self.target, &self.marker)
    }

    /// Version recorded inside `archive`, read without unpacking it.
    pub fn package_version(&self, archive: &Path) -> Result<BuildVersion> {
        ensure_archive(archive)?;
        let bytes = archive::read_entry(archive, &self.marker)?
            .ok_or_else(|| PackageError::not_found("version marker", archive.join(&self.marker)))?;
        BuildVersion::from_slice(&bytes, &archive.join(&self.marker))
    }

    /// Install `archive`, moving an existing target to `backup` first.
    ///
    /// Fails with [`PackageError::Conflict`] if the target exists and `backup`
    /// is already taken; nothing is touched in that case. The previous tree is
    /// never deleted.
    pub fn install(&self, archive: &Path, backup: &Path) -> Result<InstallReport> {
        output::action(&format!(
            "Installing {} into {}",
            archive.display(),
            self.target.display()
        ));
        ensure_archive(archive)?;

        let previous = self.usable_state()?;
        let keep_backup = previous == TargetState::Installed;
        if keep_backup {
            if backup == self.target {
                return Err(PackageError::configuration(
                    "backup directory must differ from the target",
                ));
            }
            if path_exists(backup)? {
                return Err(PackageError::Conflict {
                    backup: backup.to_path_buf(),
                });
            }
        }
        let previous_version = self.previous_version(previous);

        let staging = Staging::next_to(&self.target)?;
        archive::extract(archive, staging.path())?;
        let version = self.staged_version(&staging, previous_version.as_deref());

        if keep_backup {
            let backup_parent = staging::parent_dir(backup);
            std::fs::create_dir_all(&backup_parent)
                .fs_context("create directory", &backup_parent)?;
            std::fs::rename(&self.target, backup).fs_context("archive", &self.target)?;
            output::detail(&format!(
                "archived {} to {}",
                self.target.display(),
                backup.display()
            ));
        }

        staging.promote(&self.target)?;
        match_parent_ownership(&self.target)?;

        output::success(&format!(
            "installed {} to {}",
            version.as_deref().unwrap_or("package"),
            self.target.display()
        ));

        Ok(InstallReport {
            previous,
            previous_version,
            backup: keep_backup.then(|| backup.to_path_buf()),
            version,
        })
    }

    /// Install `archive` over the target, discarding the previous tree.
    ///
    /// The old tree is moved aside, the new one promoted, and only then is
    /// the old one removed. If the promote fails the old tree is put back.
    pub fn replace(&self, archive: &Path) -> Result<InstallReport> {
        output::action(&format!(
            "Replacing {} with {}",
            self.target.display(),
            archive.display()
        ));
        ensure_archive(archive)?;

        let previous = self.usable_state()?;
        let previous_version = self.previous_version(previous);

        let staging = Staging::next_to(&self.target)?;
        archive::extract(archive, staging.path())?;
        let version = self.staged_version(&staging, previous_version.as_deref());

        if previous == TargetState::Installed {
            let trash = staging::trash_path(&self.target)?;
            if path_exists(&trash)? {
                std::fs::remove_dir_all(&trash).fs_context("remove", &trash)?;
            }
            std::fs::rename(&self.target, &trash).fs_context("move aside", &self.target)?;

            if let Err(e) = staging.promote(&self.target) {
                if let Err(restore) = std::fs::rename(&trash, &self.target) {
                    output::error(&format!(
                        "could not restore {} from {}: {}",
                        self.target.display(),
                        trash.display(),
                        restore
                    ));
                }
                return Err(e);
            }

            std::fs::remove_dir_all(&trash).fs_context("remove", &trash)?;
            output::detail(&format!("removed previous {}", self.target.display()));
        } else {
            staging.promote(&self.target)?;
        }

        match_parent_ownership(&self.target)?;

        output::success(&format!(
            "replaced {} with {}",
            self.target.display(),
            version.as_deref().unwrap_or("package")
        ));

        Ok(InstallReport {
            previous,
            previous_version,
            backup: None,
            version,
        })
    }

    /// Remove the target recursively. Returns `false` if it was already absent.
    pub fn delete(&self) -> Result<bool> {
        match self.state()? {
            TargetState::Absent => {
                output::skip(&format!(
                    "{} already absent, nothing to delete",
                    self.target.display()
                ));
                Ok(false)
            }
            TargetState::NotADirectory => Err(not_a_directory(&self.target)),
            TargetState::Installed => {
                output::action(&format!("Deleting {}", self.target.display()));
                std::fs::remove_dir_all(&self.target).fs_context("remove", &self.target)?;
                output::success(&format!("deleted {}", self.target.display()));
                Ok(true)
            }
        }
    }

    fn usable_state(&self) -> Result<TargetState> {
        match self.state()? {
            TargetState::NotADirectory => Err(not_a_directory(&self.target)),
            state => Ok(state),
        }
    }

    fn previous_version(&self, previous: TargetState) -> Option<String> {
        if previous != TargetState::Installed {
            return None;
        }
        match self.installed_version() {
            Ok(v) => Some(v.version),
            Err(e) => {
                output::debug(&format!("cannot determine installed version: {}", e));
                None
            }
        }
    }

    /// Read the staged marker and warn about downgrades.
    fn staged_version(&self, staging: &Staging, previous: Option<&str>) -> Option<String> {
        let staged = match BuildVersion::read_from_dir(staging.path(), &self.marker) {
            Ok(v) => v.version,
            Err(e) => {
                output::warning(&format!("package has no readable version: {}", e));
                return None;
            }
        };

        if let Some(previous) = previous {
            if version::compare(&staged, previous) == Some(Ordering::Less) {
                output::warning(&format!("downgrading from {} to {}", previous, staged));
            } else {
                output::debug(&format!("upgrading from {} to {}", previous, staged));
            }
        }

        Some(staged)
    }
}

/// Whether anything sits at `path`, without following a final symlink.
fn path_exists(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PackageError::io("stat", path, e)),
    }
}

fn ensure_archive(archive: &Path) -> Result<()> {
    if archive.is_file() {
        Ok(())
    } else {
        Err(PackageError::not_found("archive", archive))
    }
}

fn not_a_directory(target: &Path) -> PackageError {
    PackageError::configuration(format!(
        "target exists and is not a directory: {}",
        target.display()
    ))
}
