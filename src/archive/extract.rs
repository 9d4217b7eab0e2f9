//! Safe full extraction of a package archive.

use super::{ArchiveFormat, open_archive, open_tar_stream};
use crate::core::error::{IoResultExt, PackageError, Result};
use crate::core::output;
use std::cell::Cell;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

/// Reader that records whether the archive stream itself failed.
struct TrackedStream<R> {
    inner: R,
    failed: Rc<Cell<bool>>,
}

impl<R: Read> Read for TrackedStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|_| self.failed.set(true))
    }
}

/// Classify an `unpack_in` failure: truncated or undecodable input is an
/// archive error, everything else happened on the destination filesystem.
fn unpack_error(
    archive: &Path,
    full_path: &Path,
    stream_failed: bool,
    e: io::Error,
) -> PackageError {
    let corrupt = matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
    );
    if stream_failed || corrupt {
        PackageError::archive(
            archive,
            format!("cannot unpack {}: {}", full_path.display(), e),
        )
    } else {
        PackageError::io("unpack", full_path, e)
    }
}

/// Lexically normalize a path (no filesystem access).
///
/// Used to validate link targets without following symlinks.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    // Preserve leading ".." for relative paths.
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}

fn ensure_no_symlink_components(archive: &Path, dest: &Path, full_path: &Path) -> Result<()> {
    let rel = full_path.strip_prefix(dest).map_err(|_| {
        PackageError::archive(
            archive,
            format!("entry outside destination: {}", full_path.display()),
        )
    })?;

    // Reject if any existing path component (including leaf) is a symlink.
    let mut cur = dest.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(md) = std::fs::symlink_metadata(&cur)
            && md.file_type().is_symlink()
        {
            return Err(PackageError::archive(
                archive,
                format!("extraction blocked: symlink in path component: {}", cur.display()),
            ));
        }
    }

    Ok(())
}

fn ensure_link_target_within_dest(
    archive: &Path,
    dest: &Path,
    link_parent: &Path,
    link_name: &Path,
) -> Result<()> {
    if link_name.is_absolute()
        || link_name
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(PackageError::archive(
            archive,
            format!("unsafe link target (absolute): {}", link_name.display()),
        ));
    }

    let candidate = normalize_lexical(&link_parent.join(link_name));
    let norm_dest = normalize_lexical(dest);
    if candidate.strip_prefix(&norm_dest).is_err() {
        return Err(PackageError::archive(
            archive,
            format!(
                "unsafe link target (escapes destination): {} -> {}",
                link_parent.display(),
                link_name.display()
            ),
        ));
    }

    Ok(())
}

fn is_unsafe_entry_path(path: &Path) -> bool {
    path.is_absolute() || path.components().any(|c| c == Component::ParentDir)
}

/// Unpack a tar stream into `dest`, entry by entry, with security checks.
fn extract_tar<R: Read>(archive: &Path, reader: R, dest: &Path) -> Result<usize> {
    let failed = Rc::new(Cell::new(false));
    let mut tarball = tar::Archive::new(TrackedStream {
        inner: reader,
        failed: Rc::clone(&failed),
    });
    tarball.set_preserve_permissions(true);
    let mut unpacked = 0;

    let entries = tarball
        .entries()
        .map_err(|e| PackageError::archive(archive, format!("read error: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| PackageError::archive(archive, format!("entry error: {}", e)))?;

        let path = entry
            .path()
            .map_err(|e| PackageError::archive(archive, format!("path error: {}", e)))?
            .into_owned();

        if is_unsafe_entry_path(&path) {
            return Err(PackageError::archive(
                archive,
                format!("unsafe entry path: {}", path.display()),
            ));
        }

        // Some archives contain a "." entry; treat it as a no-op.
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        let full_path = dest.join(&path);

        // A syntactically safe path can still escape through a symlink
        // unpacked by an earlier entry.
        ensure_no_symlink_components(archive, dest, &full_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type == tar::EntryType::Symlink || entry_type == tar::EntryType::Link {
            let link_name = entry
                .link_name()
                .map_err(|e| PackageError::archive(archive, format!("link name error: {}", e)))?;
            match link_name {
                Some(link_name) => {
                    let link_parent = full_path.parent().unwrap_or(dest);
                    ensure_link_target_within_dest(archive, dest, link_parent, &link_name)?;
                }
                None => {
                    return Err(PackageError::archive(
                        archive,
                        format!("link without target: {}", path.display()),
                    ));
                }
            }
        }

        if let Some(parent) = full_path.parent() {
            if parent.starts_with(dest) {
                ensure_no_symlink_components(archive, dest, parent)?;
            }
            std::fs::create_dir_all(parent).fs_context("create directory", parent)?;
        }

        // unpack_in resolves hardlink targets relative to dest.
        let written = entry
            .unpack_in(dest)
            .map_err(|e| unpack_error(archive, &full_path, failed.get(), e))?;
        if written {
            unpacked += 1;
        }
    }

    Ok(unpacked)
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = open_archive(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| PackageError::archive(archive, format!("zip read error: {}", e)))?;
    let mut unpacked = 0;

    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| PackageError::archive(archive, format!("zip entry error: {}", e)))?;

        let outpath = match file.enclosed_name() {
            Some(path) => dest.join(path),
            None => {
                return Err(PackageError::archive(
                    archive,
                    format!("unsafe entry path: {}", file.name()),
                ));
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath).fs_context("create directory", &outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).fs_context("create directory", parent)?;
        }

        let mut outfile = std::fs::File::create(&outpath).fs_context("create", &outpath)?;
        std::io::copy(&mut file, &mut outfile).fs_context("write", &outpath)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                    .fs_context("chmod", &outpath)?;
            }
        }
        unpacked += 1;
    }

    Ok(unpacked)
}

/// Extract `archive` into `dest`, creating `dest` if needed.
///
/// The format is detected from the file name. Entries with absolute paths,
/// `..` components or links that point outside `dest` abort the extraction
/// with [`PackageError::Archive`]. Returns the number of unpacked entries.
///
/// On error `dest` may be partially populated; callers that need atomicity
/// extract into a staging directory.
pub fn extract(archive: &Path, dest: &Path) -> Result<usize> {
    let format = ArchiveFormat::detect(archive);
    output::debug(&format!(
        "extracting {} as {:?} into {}",
        archive.display(),
        format,
        dest.display()
    ));

    std::fs::create_dir_all(dest).fs_context("create directory", dest)?;

    let filename = archive
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive".to_string());
    let pb = output::spinner(&format!("extracting {}", filename));

    let result = if format.is_tar() {
        open_tar_stream(archive, format).and_then(|stream| extract_tar(archive, stream, dest))
    } else {
        extract_zip(archive, dest)
    };

    output::progress_done(pb);

    let unpacked = result?;
    output::detail(&format!(
        "extracted {} entries from {} to {}",
        unpacked,
        filename,
        dest.display()
    ));
    Ok(unpacked)
}
