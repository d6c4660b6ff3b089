//! Artifact selection.
//!
//! Release pages list binaries next to checksums, signatures, SBOMs and
//! packages for other installers. [`choose_url`] drops the metadata and
//! picks exactly one installable artifact, preferring the cheapest install
//! path: a bare binary, then an archive, then a disk image.

/// Substrings marking release metadata rather than installable artifacts.
const METADATA_MARKERS: &[&str] = &[
    "checksum",
    "sha256",
    "sha512",
    "sha1",
    "shasum",
    ".sha",
    ".sig",
    ".asc",
    ".pem",
    ".crt",
    ".cert",
    "sbom",
    ".spdx",
    ".intoto",
    ".pub",
    ".key",
];

/// Archive suffixes the unpacker supports.
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".tar.xz", ".txz", ".tar", ".zip"];

/// Disk image suffixes.
pub const DISK_IMAGE_SUFFIXES: &[&str] = &[".dmg"];

/// How a downloaded artifact must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A ready-to-run executable without a file extension.
    Bare,
    /// A supported archive.
    Archive,
    /// A disk image that needs mounting.
    DiskImage,
    /// Anything else (`.deb`, `.exe`, ...).
    Other,
}

impl ArtifactKind {
    /// Classify an artifact by its file name or URL.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        let name = file_name(name).to_lowercase();
        if DISK_IMAGE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            Self::DiskImage
        } else if ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            Self::Archive
        } else if has_extension(&name) {
            Self::Other
        } else {
            Self::Bare
        }
    }
}

/// Why no single artifact could be chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// Nothing installable survived filtering.
    NoValidArtifact,
    /// More than one candidate survived the deciding tier.
    Ambiguous(Vec<String>),
}

/// The final path segment of a URL, without query string or fragment.
#[must_use]
pub fn file_name(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether a file name denotes release metadata (checksums, signatures, ...).
#[must_use]
pub fn is_release_metadata(name: &str) -> bool {
    let name = file_name(name).to_lowercase();
    METADATA_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Whether a file name carries a real extension.
///
/// Version numbers are not extensions: `tool-v1.0` and
/// `tool_1.2.3_linux_amd64` are bare names, `tool.exe` is not.
#[must_use]
pub fn has_extension(name: &str) -> bool {
    let name = file_name(name);
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 8
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Pick exactly one installable URL out of `candidates`.
///
/// # Errors
///
/// [`SelectError::NoValidArtifact`] when nothing installable remains,
/// [`SelectError::Ambiguous`] when the first non-empty tier holds more than
/// one URL.
pub fn choose_url<S: AsRef<str>>(candidates: &[S]) -> Result<String, SelectError> {
    let mut urls: Vec<&str> = Vec::new();
    for url in candidates.iter().map(AsRef::as_ref) {
        if !is_release_metadata(url) && !urls.contains(&url) {
            urls.push(url);
        }
    }

    for tier in [ArtifactKind::Bare, ArtifactKind::Archive, ArtifactKind::DiskImage] {
        let matching: Vec<&str> = urls
            .iter()
            .copied()
            .filter(|url| ArtifactKind::classify(url) == tier)
            .collect();
        match matching.as_slice() {
            [] => {}
            [only] => return Ok((*only).to_string()),
            many => {
                return Err(SelectError::Ambiguous(
                    many.iter().map(|s| (*s).to_string()).collect(),
                ));
            }
        }
    }

    Err(SelectError::NoValidArtifact)
}
