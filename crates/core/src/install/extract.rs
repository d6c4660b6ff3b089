//! Archive unpacking.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;
use xz2::read::XzDecoder;

use crate::{Error, Result};

/// Archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar`
    Tar,
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.xz` / `.txz`
    TarXz,
}

impl ArchiveFormat {
    /// Detect the format from a file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Unpack `archive` into `dest`.
///
/// # Errors
///
/// Returns an installation error if the archive is corrupt or uses an
/// unsupported format.
pub fn unpack(tool: &str, archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = ArchiveFormat::from_name(&name)
        .ok_or_else(|| Error::installation(tool, format!("Unsupported archive '{name}'")))?;

    std::fs::create_dir_all(dest)
        .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "create unpack directory"))?;
    let file =
        File::open(archive).map_err(|e| Error::io(e, Some(archive.to_path_buf()), "open archive"))?;
    let reader = BufReader::new(file);

    match format {
        ArchiveFormat::Zip => unpack_zip(tool, reader, dest),
        ArchiveFormat::Tar => unpack_tar(tool, reader, dest),
        ArchiveFormat::TarGz => unpack_tar(tool, GzDecoder::new(reader), dest),
        ArchiveFormat::TarXz => unpack_tar(tool, XzDecoder::new(reader), dest),
    }
}

fn unpack_tar<R: Read>(tool: &str, reader: R, dest: &Path) -> Result<()> {
    Archive::new(reader)
        .unpack(dest)
        .map_err(|e| Error::installation(tool, format!("Failed to extract tar: {e}")))
}

fn unpack_zip(tool: &str, reader: BufReader<File>, dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| Error::installation(tool, format!("Failed to open zip: {e}")))?;
    archive
        .extract(dest)
        .map_err(|e| Error::installation(tool, format!("Failed to extract zip: {e}")))
}

/// Find the single file named `binary` below `dir`.
///
/// # Errors
///
/// Returns an installation error when no entry or more than one entry
/// matches.
pub fn find_binary(tool: &str, dir: &Path, binary: &str) -> Result<PathBuf> {
    let matches: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == binary)
        .map(walkdir::DirEntry::into_path)
        .collect();

    match matches.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err(Error::installation(
            tool,
            format!("Binary '{binary}' not found in archive"),
        )),
        many => Err(Error::installation(
            tool,
            format!(
                "Binary '{binary}' found {} times in archive: {}",
                many.len(),
                many.iter()
                    .map(|p| p.strip_prefix(dir).unwrap_or(p).display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )),
    }
}
