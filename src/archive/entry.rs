//! Single-entry reads without extracting the archive.

use super::{ArchiveFormat, entry_key, open_archive, open_tar_stream};
use crate::core::error::{PackageError, Result};
use std::io::Read;
use std::path::Path;

/// Largest entry [`read_entry`] will hold in memory
pub const MAX_ENTRY_BYTES: u64 = 1024 * 1024;

/// Read one entry from `archive` into memory.
///
/// Tar streams are scanned until the entry is found, so nothing is written to
/// disk and later entries are never decompressed. A leading `./` on either side
/// is ignored. Returns `Ok(None)` when the archive has no such entry. Entries
/// larger than [`MAX_ENTRY_BYTES`] are rejected as archive errors.
pub fn read_entry(archive: &Path, entry: &Path) -> Result<Option<Vec<u8>>> {
    let wanted = entry_key(entry);
    let format = ArchiveFormat::detect(archive);

    if !format.is_tar() {
        return read_zip_entry(archive, &wanted);
    }

    let stream = open_tar_stream(archive, format)?;
    let mut tarball = tar::Archive::new(stream);
    let entries = tarball
        .entries()
        .map_err(|e| PackageError::archive(archive, format!("read error: {}", e)))?;

    for item in entries {
        let mut item =
            item.map_err(|e| PackageError::archive(archive, format!("entry error: {}", e)))?;
        let path = item
            .path()
            .map_err(|e| PackageError::archive(archive, format!("path error: {}", e)))?;
        if entry_key(&path) != wanted || !item.header().entry_type().is_file() {
            continue;
        }

        return read_bounded(archive, item.size(), &mut item).map(Some);
    }

    Ok(None)
}

fn read_zip_entry(archive: &Path, wanted: &str) -> Result<Option<Vec<u8>>> {
    let file = open_archive(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| PackageError::archive(archive, format!("zip read error: {}", e)))?;

    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| PackageError::archive(archive, format!("zip entry error: {}", e)))?;
        if file.is_dir() || entry_key(Path::new(file.name())) != wanted {
            continue;
        }

        let declared = file.size();
        return read_bounded(archive, declared, &mut file).map(Some);
    }

    Ok(None)
}

/// Read at most `MAX_ENTRY_BYTES`; the header size is checked first but not trusted.
fn read_bounded(archive: &Path, declared: u64, reader: impl Read) -> Result<Vec<u8>> {
    if declared > MAX_ENTRY_BYTES {
        return Err(too_large(archive, declared));
    }

    let mut buf = Vec::new();
    reader
        .take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|e| PackageError::archive(archive, format!("entry read error: {}", e)))?;
    if buf.len() as u64 > MAX_ENTRY_BYTES {
        return Err(too_large(archive, buf.len() as u64));
    }
    Ok(buf)
}

fn too_large(archive: &Path, size: u64) -> PackageError {
    PackageError::archive(
        archive,
        format!(
            "entry of {} bytes exceeds the {} byte limit",
            size, MAX_ENTRY_BYTES
        ),
    )
}
