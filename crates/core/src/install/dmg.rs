//! macOS disk images.
//!
//! The image is mounted read-only with `hdiutil`. Candidates are executables
//! inside `.app` bundles and payloads of `.pkg` installers, expanded with
//! `pkgutil --expand-full`. The first candidate that reports a version wins.
//! The image is always detached.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::probe::probe_version;
use crate::{Error, Result};

/// A mounted image, detached on drop.
struct Mount {
    mount_point: PathBuf,
}

impl Mount {
    fn attach(tool: &str, image: &Path, mount_point: &Path) -> Result<Self> {
        std::fs::create_dir_all(mount_point)
            .map_err(|e| Error::io(e, Some(mount_point.to_path_buf()), "create mount point"))?;
        run(
            tool,
            Command::new("hdiutil")
                .arg("attach")
                .arg("-nobrowse")
                .arg("-readonly")
                .arg("-mountpoint")
                .arg(mount_point)
                .arg(image),
        )?;
        debug!(image = %image.display(), mount_point = %mount_point.display(), "Attached disk image");
        Ok(Self {
            mount_point: mount_point.to_path_buf(),
        })
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        let status = Command::new("hdiutil")
            .arg("detach")
            .arg("-force")
            .arg(&self.mount_point)
            .status();
        match status {
            Ok(s) if s.success() => debug!(mount_point = %self.mount_point.display(), "Detached"),
            Ok(s) => warn!(mount_point = %self.mount_point.display(), status = %s, "Detach failed"),
            Err(e) => warn!(mount_point = %self.mount_point.display(), error = %e, "Detach failed"),
        }
    }
}

fn run(tool: &str, command: &mut Command) -> Result<()> {
    let output = command
        .output()
        .map_err(|e| Error::installation(tool, format!("Failed to run {command:?}: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::installation(
            tool,
            format!(
                "{command:?} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ))
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Mount `image`, find a working `binary` and copy it to `dest`.
///
/// `work_dir` receives the mount point and expanded packages.
///
/// # Errors
///
/// Returns an installation error when mounting fails or no candidate
/// reports a version.
pub fn extract_from_image(
    tool: &str,
    image: &Path,
    binary: &str,
    work_dir: &Path,
    dest: &Path,
) -> Result<()> {
    if std::env::consts::OS != "macos" {
        return Err(Error::installation(tool, "Disk images can only be installed on macOS"));
    }

    let mount = Mount::attach(tool, image, &work_dir.join("mount"))?;
    let mut candidates = app_candidates(&mount.mount_point, binary);

    let packages: Vec<PathBuf> = WalkDir::new(&mount.mount_point)
        .max_depth(2)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .map(walkdir::DirEntry::into_path)
        .filter(|p| has_extension(p, "pkg"))
        .collect();

    for (index, package) in packages.iter().enumerate() {
        let expanded = work_dir.join(format!("pkg-{index}"));
        run(
            tool,
            Command::new("pkgutil")
                .arg("--expand-full")
                .arg(package)
                .arg(&expanded),
        )?;
        candidates.extend(named_files(&expanded, binary));
    }

    debug!(tool, candidates = candidates.len(), "Probing disk image candidates");
    let found = candidates
        .into_iter()
        .find(|candidate| probe_version(candidate).is_ok())
        .ok_or_else(|| {
            Error::installation(tool, format!("No working '{binary}' found in disk image"))
        })?;

    let placed = super::place(tool, &found, dest);
    drop(mount);
    placed
}

/// Executables under `*.app/Contents/MacOS`, exact name matches first.
fn app_candidates(root: &Path, binary: &str) -> Vec<PathBuf> {
    let mut exact = Vec::new();
    let mut others = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let in_app_bundle = path
            .parent()
            .is_some_and(|p| p.ends_with("Contents/MacOS"))
            && path.ancestors().any(|a| has_extension(a, "app"));
        if !in_app_bundle {
            continue;
        }
        if entry.file_name().eq_ignore_ascii_case(binary) {
            exact.push(path.to_path_buf());
        } else {
            others.push(path.to_path_buf());
        }
    }
    exact.extend(others);
    exact
}

fn named_files(root: &Path, binary: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == binary)
        .map(walkdir::DirEntry::into_path)
        .collect()
}
