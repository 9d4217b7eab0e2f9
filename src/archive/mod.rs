//! Archive access
//!
//! Native extraction and single-entry reads for the archive formats a vendor
//! package may ship in. No external tools are needed.

mod entry;
mod extract;

pub use entry::{MAX_ENTRY_BYTES, read_entry};
pub use extract::extract;

use crate::core::error::{PackageError, Result};
use crate::core::error::IoResultExt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    TarZst,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from the file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Some(Self::TarZst)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Detect the format, treating unknown names as gzip-compressed tar.
    ///
    /// Vendor packages are distributed as `.tgz` but are often renamed when
    /// mounted into a container.
    pub fn detect(path: &Path) -> Self {
        Self::from_path(path).unwrap_or(Self::TarGz)
    }

    pub fn is_tar(self) -> bool {
        !matches!(self, Self::Zip)
    }
}

/// Open an archive file, mapping a missing file to `NotFound`.
fn open_archive(path: &Path) -> Result<File> {
    match File::open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PackageError::not_found("archive", path))
        }
        Err(e) => Err(PackageError::io("open", path, e)),
    }
}

/// Open a decompressing reader over the tar stream of `path`.
fn open_tar_stream(path: &Path, format: ArchiveFormat) -> Result<Box<dyn Read>> {
    let reader = BufReader::new(open_archive(path)?);
    let stream: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(flate2::read::GzDecoder::new(reader)),
        ArchiveFormat::TarXz => Box::new(xz2::read::XzDecoder::new(reader)),
        ArchiveFormat::TarBz2 => Box::new(bzip2::read::BzDecoder::new(reader)),
        ArchiveFormat::TarZst => {
            Box::new(zstd::stream::read::Decoder::new(reader).fs_context("decompress", path)?)
        }
        ArchiveFormat::Tar => Box::new(reader),
        ArchiveFormat::Zip => {
            return Err(PackageError::archive(path, "zip archives have no tar stream"));
        }
    };
    Ok(stream)
}

/// Normalize an entry name for comparison: drop `./` and empty components.
fn entry_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(seg) => Some(seg.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixture builders for archive tests.

    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

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
        let encoder = builder.into_inner().unwrap();
        encoder.finish().unwrap();
    }

    /// Write a stored `.zip` containing the given files.
    pub fn write_zip(archive: &Path, files: &[(&str, &str)]) {
        let file = File::create(archive).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
}
