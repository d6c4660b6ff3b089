//! Local version probing.
//!
//! Finds a tool's executable and asks it for its version. Never touches the
//! network.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

use crate::tools::Tool;
use crate::{Error, Result};

/// Semantic version grammar with optional prerelease and build suffixes.
#[allow(clippy::expect_used)]
static SEMVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)",
        r"(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?",
        r"(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?",
    ))
    .expect("semver pattern is valid")
});

const PROBE_ARGS: &[&str] = &["--version", "version"];

/// Where a local executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The tool's declared target path.
    Target,
    /// `install_dir/name`.
    InstallDir,
    /// The system executable search path.
    SearchPath,
}

/// A probed local installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVersion {
    /// Parsed semantic version.
    pub version: String,
    /// Path of the executable.
    pub path: PathBuf,
    /// How the executable was found.
    pub location: Location,
}

/// First semantic version found in `output`.
#[must_use]
pub fn extract_version(output: &str) -> Option<String> {
    SEMVER.find(output).map(|m| m.as_str().to_string())
}

/// Find the executable of `tool`: declared target, then `install_dir/name`,
/// then the search path.
#[must_use]
pub fn locate(tool: &Tool, install_dir: &Path) -> Option<(PathBuf, Location)> {
    if let Some(target) = &tool.target
        && target.is_file()
    {
        return Some((target.clone(), Location::Target));
    }

    let managed = install_dir.join(&tool.name);
    if managed.is_file() {
        return Some((managed, Location::InstallDir));
    }

    which::which(&tool.name)
        .ok()
        .map(|path| (path, Location::SearchPath))
}

/// Run `path` with each probe argument and parse the first version found in
/// its combined output.
///
/// # Errors
///
/// [`Error::VersionUnparseable`] when no probe yields a version.
pub fn probe_version(path: &Path) -> Result<String> {
    let mut last_output = String::new();
    for arg in PROBE_ARGS {
        let output = match Command::new(path).arg(arg).output() {
            Ok(output) => output,
            Err(e) => {
                debug!(path = %path.display(), arg, error = %e, "Probe failed to run");
                last_output = e.to_string();
                continue;
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if let Some(version) = extract_version(&combined) {
            debug!(path = %path.display(), arg, %version, "Probed version");
            return Ok(version);
        }
        last_output = combined;
    }

    Err(Error::version_unparseable(path, last_output.trim()))
}

/// Locate and probe `tool`.
///
/// # Errors
///
/// [`Error::NotInstalled`] when no executable exists,
/// [`Error::VersionUnparseable`] when it does not report a version.
pub fn local_version(tool: &Tool, install_dir: &Path) -> Result<LocalVersion> {
    let (path, location) =
        locate(tool, install_dir).ok_or_else(|| Error::not_installed(&tool.name))?;
    let version = probe_version(&path)?;
    Ok(LocalVersion {
        version,
        path,
        location,
    })
}

/// Whether a local version equals an upstream one.
///
/// Upstream versions are often tags (`v1.30.0`, `cli/v2.1.0`); the
/// semantic version embedded in each side is compared.
#[must_use]
pub fn same_version(local: &str, upstream: &str) -> bool {
    let normalize = |raw: &str| {
        extract_version(raw).unwrap_or_else(|| raw.trim().trim_start_matches('v').to_string())
    };
    let (local, upstream) = (normalize(local), normalize(upstream));
    match (
        semver::Version::parse(&local),
        semver::Version::parse(&upstream),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => local == upstream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSource;

    #[cfg(unix)]
    fn fake_executable(dir: &Path, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn tool(name: &str) -> Tool {
        Tool::new(name, ToolSource::HashiCorp { product: None })
    }

    #[test]
    fn test_extract_version_prerelease() {
        assert_eq!(
            extract_version("my-tool version 1.2.3-rc.1\n").as_deref(),
            Some("1.2.3-rc.1")
        );
    }

    #[test]
    fn test_extract_version_variants() {
        assert_eq!(
            extract_version("Client Version: v1.30.0").as_deref(),
            Some("1.30.0")
        );
        assert_eq!(
            extract_version("Terraform v1.7.5\non linux_amd64").as_deref(),
            Some("1.7.5")
        );
        assert_eq!(
            extract_version("tool 2.0.0+build.5 (abc)").as_deref(),
            Some("2.0.0+build.5")
        );
        assert_eq!(extract_version("no version here"), None);
        assert_eq!(extract_version("1.2"), None);
    }

    #[test]
    fn test_same_version() {
        assert!(same_version("1.30.0", "v1.30.0"));
        assert!(same_version("2.40.1", "2.40.1"));
        assert!(same_version("0.22.0", "cli/v0.22.0"));
        assert!(!same_version("1.29.0", "v1.30.0"));
        assert!(same_version("1.0.0+build.1", "v1.0.0+build.1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_version_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_executable(dir.path(), "tool", "echo \"tool version 1.2.3-rc.1\"");
        assert_eq!(probe_version(&path).unwrap(), "1.2.3-rc.1");
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_falls_back_to_subcommand() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_executable(
            dir.path(),
            "tool",
            "if [ \"$1\" = version ]; then echo 'v0.9.1' >&2; else echo 'unknown flag' >&2; exit 1; fi",
        );
        assert_eq!(probe_version(&path).unwrap(), "0.9.1");
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_unparseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_executable(dir.path(), "tool", "echo 'no idea'");
        let err = probe_version(&path).unwrap_err();
        assert!(matches!(err, Error::VersionUnparseable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_local_version_prefers_target() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join("bin");
        std::fs::create_dir_all(&install_dir).unwrap();
        fake_executable(&install_dir, "mytool-x1", "echo 1.0.0");
        let target = fake_executable(dir.path(), "pinned", "echo 2.0.0");

        let found = local_version(&tool("mytool-x1").with_target(&target), &install_dir).unwrap();
        assert_eq!(found.version, "2.0.0");
        assert_eq!(found.location, Location::Target);

        let found = local_version(&tool("mytool-x1"), &install_dir).unwrap();
        assert_eq!(found.version, "1.0.0");
        assert_eq!(found.location, Location::InstallDir);
    }

    #[test]
    fn test_local_version_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let err = local_version(&tool("mercado-surely-missing-tool"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotInstalled { .. }));
    }
}
