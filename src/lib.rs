//! Vendor package installer for container images
//!
//! Installs a vendor archive (`Senzing_API.tgz` or equivalent) into a target
//! directory and reports the versions of the installed tree and of the archive.
//!
//! # Example
//!
//! ```no_run
//! use senzing_package::Installer;
//! use std::path::Path;
//!
//! let installer = Installer::new("/opt/senzing");
//! let report = installer.install(
//!     Path::new("downloads/Senzing_API.tgz"),
//!     Path::new("/opt/senzing-original"),
//! )?;
//! println!("installed {:?}", report.version);
//! # Ok::<(), senzing_package::PackageError>(())
//! ```
//!
//! # Operations
//!
//! - `install` - move an existing target to a backup, then unpack the archive
//! - `replace` - unpack the archive over the target, discarding the old tree
//! - `delete` - remove the target; a no-op if it is already absent
//! - `installed_version` / `package_version` - read `g2/data/g2BuildVersion.json`
//!
//! Archives are unpacked into a hidden staging sibling and promoted by rename,
//! so the target never holds a partially extracted package.

pub mod archive;
pub mod core;
pub mod installer;

pub use crate::core::config::{BackupPolicy, Settings};
pub use crate::core::error::{PackageError, Result};
pub use crate::core::output;
pub use crate::core::version::{BuildVersion, VERSION_MARKER};
pub use installer::{InstallReport, Installer, TargetState};
