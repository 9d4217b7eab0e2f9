//! Test fixtures - package archives and target layouts.

#![allow(dead_code)]

use senzing_package::VERSION_MARKER;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch area holding archives and an install root.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Install target, `<root>/opt/pkg`. Its parent does not exist yet.
    pub fn target(&self) -> PathBuf {
        self.root().join("opt/pkg")
    }

    /// Default backup location for `target()`.
    pub fn backup(&self) -> PathBuf {
        self.root().join("opt/pkg-original")
    }

    /// Write a `.tgz` package with the given version and extra files.
    pub fn package(&self, version: &str, files: &[(&str, &str)]) -> PathBuf {
        let archive = self.root().join(format!("Senzing_API-{}.tgz", version));
        let marker = format!(
            r#"{{"PLATFORM": "Linux", "VERSION": "{}", "BUILD_NUMBER": "test"}}"#,
            version
        );
        let mut all = vec![(VERSION_MARKER, marker.as_str())];
        all.extend_from_slice(files);
        write_tar_gz(&archive, &all);
        archive
    }

    /// Names of the entries next to the target, sorted.
    pub fn siblings(&self) -> Vec<String> {
        let parent = self.root().join("opt");
        if !parent.exists() {
            return Vec::new();
        }
        let mut names: Vec<_> = std::fs::read_dir(parent)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Write a `.tar.gz` containing the given `(path, contents)` files.
pub fn write_tar_gz(archive: &Path, files: &[(&str, &str)]) {
    let file = File::create(archive).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}
