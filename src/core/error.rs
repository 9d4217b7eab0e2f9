//! Error types for package operations.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while installing, replacing, deleting or inspecting a package.
#[derive(Error, Debug)]
pub enum PackageError {
    /// Missing or invalid configuration value (empty path, bad boolean, ...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backup directory for an install already exists
    #[error("backup directory already exists: {}", backup.display())]
    Conflict { backup: PathBuf },

    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("cannot {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corrupt, unreadable or unsafe archive contents
    #[error("archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("malformed version marker {}: {message}", path.display())]
    VersionMarker { path: PathBuf, message: String },
}

/// Result alias for package operations
pub type Result<T> = std::result::Result<T, PackageError>;

impl PackageError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn not_found(what: &'static str, path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            what,
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn archive(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Wrap an IO error, turning `NotFound` into [`PackageError::NotFound`].
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound { what: "path", path };
        }
        Self::Filesystem {
            action,
            path,
            source,
        }
    }

    /// Process exit status for this error.
    ///
    /// Configuration = 2, conflict = 3, not found = 4, anything else = 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::Conflict { .. } => 3,
            Self::NotFound { .. } => 4,
            Self::Filesystem { .. } | Self::Archive { .. } | Self::VersionMarker { .. } => 1,
        }
    }
}

/// Attach a filesystem action and path to an `io::Result`.
pub(crate) trait IoResultExt<T> {
    fn fs_context(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn fs_context(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| PackageError::io(action, path, e))
    }
}
