//! Version marker parsing and comparison
//!
//! Every package carries a build descriptor at `g2/data/g2BuildVersion.json`:
//!
//! ```json
//! {
//!     "PLATFORM": "Linux",
//!     "VERSION": "2.1.0",
//!     "API_VERSION": "2.1.0",
//!     "BUILD_VERSION": "2.1.0.20123",
//!     "BUILD_NUMBER": "2020_04_30__19_00",
//!     "DATA_VERSION": "1.0.0"
//! }
//! ```
//!
//! Only `VERSION` is required. The same file is read from an installed tree
//! and, without unpacking, from the source archive.

use crate::core::error::{PackageError, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

/// Location of the version marker relative to the package root
pub const VERSION_MARKER: &str = "g2/data/g2BuildVersion.json";

/// Parsed contents of a version marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildVersion {
    #[serde(rename = "VERSION")]
    pub version: String,
    #[serde(rename = "PLATFORM", default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(rename = "API_VERSION", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(rename = "BUILD_VERSION", default, skip_serializing_if = "Option::is_none")]
    pub build_version: Option<String>,
    #[serde(rename = "BUILD_NUMBER", default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    #[serde(rename = "DATA_VERSION", default, skip_serializing_if = "Option::is_none")]
    pub data_version: Option<String>,
}

impl BuildVersion {
    /// Parse marker bytes. `origin` is only used for error messages.
    pub fn from_slice(bytes: &[u8], origin: &Path) -> Result<Self> {
        let parsed: BuildVersion =
            serde_json::from_slice(bytes).map_err(|e| PackageError::VersionMarker {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        if parsed.version.trim().is_empty() {
            return Err(PackageError::VersionMarker {
                path: origin.to_path_buf(),
                message: "VERSION is empty".to_string(),
            });
        }

        Ok(parsed)
    }

    /// Read the marker from an unpacked package rooted at `root`.
    pub fn read_from_dir(root: &Path, marker: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(PackageError::not_found("target directory", root));
        }

        let marker_path = root.join(marker);
        let bytes = match std::fs::read(&marker_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackageError::not_found("version marker", &marker_path));
            }
            Err(e) => return Err(PackageError::io("read", &marker_path, e)),
        };

        Self::from_slice(&bytes, &marker_path)
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}

/// Compare two version strings as semver.
///
/// Partial versions are padded (`2.1` -> `2.1.0`). Returns `None` when either
/// side cannot be parsed.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    let a = parse_lenient(a)?;
    let b = parse_lenient(b)?;
    Some(a.cmp(&b))
}

fn parse_lenient(version: &str) -> Option<Version> {
    let version = version.trim();
    Version::parse(version)
        .or_else(|_| Version::parse(&pad_version(version)))
        .ok()
}

fn pad_version(version: &str) -> String {
    let parts: Vec<&str> = version.split('.').collect();
    match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_marker() {
        let json = br#"{
            "PLATFORM": "Linux",
            "VERSION": "1.7.19095",
            "API_VERSION": "1.7.19095",
            "BUILD_NUMBER": "2019_04_05__02_00"
        }"#;
        let v = BuildVersion::from_slice(json, Path::new("marker")).unwrap();
        assert_eq!(v.version, "1.7.19095");
        assert_eq!(v.platform.as_deref(), Some("Linux"));
        assert_eq!(v.build_number.as_deref(), Some("2019_04_05__02_00"));
        assert_eq!(v.data_version, None);
        assert_eq!(v.to_string(), "1.7.19095");
    }

    #[test]
    fn test_missing_version_key_is_malformed() {
        let err = BuildVersion::from_slice(br#"{"PLATFORM": "Linux"}"#, Path::new("m"))
            .unwrap_err();
        assert!(matches!(err, PackageError::VersionMarker { .. }));

        let err = BuildVersion::from_slice(br#"{"VERSION": "  "}"#, Path::new("m")).unwrap_err();
        assert!(err.to_string().contains("VERSION is empty"));
    }

    #[test]
    fn test_read_from_dir() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join(VERSION_MARKER);
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(&marker, r#"{"VERSION": "2.1.0"}"#).unwrap();

        let v = BuildVersion::read_from_dir(temp.path(), Path::new(VERSION_MARKER)).unwrap();
        assert_eq!(v.version, "2.1.0");
    }

    #[test]
    fn test_read_from_dir_not_found() {
        let temp = tempdir().unwrap();

        let err = BuildVersion::read_from_dir(&temp.path().join("absent"), Path::new(VERSION_MARKER))
            .unwrap_err();
        assert!(matches!(
            err,
            PackageError::NotFound {
                what: "target directory",
                ..
            }
        ));

        let err = BuildVersion::read_from_dir(temp.path(), Path::new(VERSION_MARKER)).unwrap_err();
        assert!(matches!(
            err,
            PackageError::NotFound {
                what: "version marker",
                ..
            }
        ));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare("2.1.0", "1.0.0"), Some(Ordering::Greater));
        assert_eq!(compare("1.7", "1.7.0"), Some(Ordering::Equal));
        assert_eq!(compare("1.7.19095", "1.10.0"), Some(Ordering::Less));
        assert_eq!(compare("nightly", "1.0.0"), None);
    }
}
