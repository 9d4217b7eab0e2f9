//! Resolved configuration for a single invocation.
//!
//! Values come from command-line flags, then environment variables, then the
//! defaults below. clap performs the flag/env layering; this module owns the
//! defaults, boolean parsing and the rules that derive a backup path.

use crate::core::error::{PackageError, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default installation directory
pub const DEFAULT_SENZING_DIR: &str = "/opt/senzing";

/// Default location of the vendor archive
pub const DEFAULT_SENZING_PACKAGE: &str = "downloads/Senzing_API.tgz";

/// Default `sleep` duration
pub const DEFAULT_SLEEP_TIME_IN_SECONDS: u64 = 600;

/// Suffix appended to the target to form the default backup path
pub const DEFAULT_BACKUP_SUFFIX: &str = "-original";

/// Parse a boolean setting the way environment variables are usually written.
///
/// Accepts `true, 1, t, y, yes, on` and `false, 0, f, n, no, off`, ignoring case.
pub fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "y" | "yes" | "on" => Ok(true),
        "false" | "0" | "f" | "n" | "no" | "off" | "" => Ok(false),
        other => Err(format!("expected a boolean, got '{}'", other)),
    }
}

/// How the backup directory of an `install` is named
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupPolicy {
    /// `<target><suffix>`
    Suffix(String),
    /// `<target>-<version>.<unix seconds>`, or `<target>.<unix seconds>` without a version
    Versioned,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self::Suffix(DEFAULT_BACKUP_SUFFIX.to_string())
    }
}

impl BackupPolicy {
    /// Backup path for `target`, given the version currently installed there.
    ///
    /// The backup is always a sibling of `target`, also when `target` is
    /// written with a trailing slash.
    pub fn backup_path(&self, target: &Path, current_version: Option<&str>) -> PathBuf {
        let mut name = target
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        match self {
            Self::Suffix(suffix) => name.push(suffix),
            Self::Versioned => {
                if let Some(version) = current_version {
                    name.push(format!("-{}", version));
                }
                name.push(format!(".{}", unix_now()));
            }
        }
        target.parent().unwrap_or(Path::new("")).join(name)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Configuration shared by all subcommands
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub senzing_dir: PathBuf,
    pub senzing_package: PathBuf,
    /// Explicit backup path; overrides `backup_policy` when set
    pub backup_dir: Option<PathBuf>,
    pub backup_policy: BackupPolicy,
    pub debug: bool,
    pub sleep_time_in_seconds: u64,
    pub subcommand: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            senzing_dir: PathBuf::from(DEFAULT_SENZING_DIR),
            senzing_package: PathBuf::from(DEFAULT_SENZING_PACKAGE),
            backup_dir: None,
            backup_policy: BackupPolicy::default(),
            debug: false,
            sleep_time_in_seconds: DEFAULT_SLEEP_TIME_IN_SECONDS,
            subcommand: String::new(),
        }
    }
}

impl Settings {
    /// Reject values no subcommand can work with.
    pub fn validate(&self) -> Result<()> {
        if self.senzing_dir.as_os_str().is_empty() {
            return Err(PackageError::configuration("SENZING_DIR must not be empty"));
        }
        if self.senzing_dir.parent().is_none() {
            return Err(PackageError::configuration(format!(
                "SENZING_DIR cannot be the filesystem root: {}",
                self.senzing_dir.display()
            )));
        }
        if self.senzing_dir.file_name().is_none() {
            return Err(PackageError::configuration(format!(
                "SENZING_DIR must end in a directory name: {}",
                self.senzing_dir.display()
            )));
        }
        if self.senzing_package.as_os_str().is_empty() {
            return Err(PackageError::configuration(
                "SENZING_PACKAGE must not be empty",
            ));
        }
        if let Some(backup) = &self.backup_dir {
            if backup.as_os_str().is_empty() {
                return Err(PackageError::configuration(
                    "SENZING_BACKUP_DIR must not be empty",
                ));
            }
            if backup == &self.senzing_dir {
                return Err(PackageError::configuration(
                    "SENZING_BACKUP_DIR must differ from SENZING_DIR",
                ));
            }
        }
        Ok(())
    }

    /// Where `install` moves an existing target.
    pub fn resolve_backup_dir(&self, current_version: Option<&str>) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => self
                .backup_policy
                .backup_path(&self.senzing_dir, current_version),
        }
    }

    /// Settings as a single JSON line for entry/exit logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
