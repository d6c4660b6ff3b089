//! Installing downloaded artifacts.
//!
//! [`DownloadInstaller`] downloads a release's URL into a temporary
//! directory and, depending on the [`ArtifactKind`], copies the bare
//! binary, unpacks an archive, or mounts a disk image. The executable is
//! copied to its destination with mode `0755`.

pub mod dmg;
pub mod extract;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::http::HttpSession;
use crate::select::{ArtifactKind, file_name};
use crate::tools::{InstallOptions, Installer, Release, Tool};
use crate::{Error, Result};

/// Copy `src` to `dest`, creating parent directories, and mark it
/// executable.
///
/// # Errors
///
/// Returns an I/O error if the copy or permission change fails.
pub fn place(tool: &str, src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::io(e, Some(parent.to_path_buf()), "create install directory"))?;
    }
    std::fs::copy(src, dest)
        .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "copy executable"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "set permissions"))?;
    }

    debug!(tool, from = %src.display(), to = %dest.display(), "Placed executable");
    Ok(())
}

/// Installs a release by downloading its URL.
#[derive(Debug)]
pub struct DownloadInstaller {
    session: HttpSession,
    release: Release,
    binary: String,
    destination: PathBuf,
}

impl DownloadInstaller {
    /// Create an installer for a release that carries a URL.
    ///
    /// # Errors
    ///
    /// Returns an installation error if the release has no URL.
    pub fn new(
        session: HttpSession,
        tool: &Tool,
        release: Release,
        options: &InstallOptions,
    ) -> Result<Self> {
        if release.url.is_none() {
            return Err(Error::installation(&tool.name, "Release has no download URL"));
        }
        Ok(Self {
            session,
            binary: tool.binary_name().to_string(),
            destination: tool.install_path(&options.install_dir),
            release,
        })
    }
}

/// Boxed [`DownloadInstaller`], the usual `installer` of URL-based backends.
///
/// # Errors
///
/// Returns an installation error if the release has no URL.
pub fn download_installer(
    session: &HttpSession,
    tool: &Tool,
    release: Release,
    options: &InstallOptions,
) -> Result<Box<dyn Installer>> {
    Ok(Box::new(DownloadInstaller::new(
        session.clone(),
        tool,
        release,
        options,
    )?))
}

#[async_trait]
impl Installer for DownloadInstaller {
    fn release(&self) -> &Release {
        &self.release
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    async fn install(&self) -> Result<()> {
        let tool = self.release.tool.clone();
        let url = self
            .release
            .url
            .as_deref()
            .ok_or_else(|| Error::installation(&tool, "Release has no download URL"))?;

        let work_dir = tempfile::tempdir()
            .map_err(|e| Error::io(e, None, "create temporary directory"))?;
        let artifact_name = match file_name(url) {
            "" => "download",
            name => name,
        };
        let artifact = work_dir.path().join(artifact_name);

        info!(%tool, version = %self.release.version, %url, "Downloading");
        self.session.download(url, &artifact).await?;

        let kind = ArtifactKind::classify(url);
        let binary = self.binary.clone();
        let destination = self.destination.clone();
        let work = work_dir.path().to_path_buf();
        let task_tool = tool.clone();

        tokio::task::spawn_blocking(move || match kind {
            ArtifactKind::Bare => place(&task_tool, &artifact, &destination),
            ArtifactKind::Archive => {
                let unpacked = work.join("unpacked");
                extract::unpack(&task_tool, &artifact, &unpacked)?;
                let found = extract::find_binary(&task_tool, &unpacked, &binary)?;
                place(&task_tool, &found, &destination)
            }
            ArtifactKind::DiskImage => {
                dmg::extract_from_image(&task_tool, &artifact, &binary, &work, &destination)
            }
            ArtifactKind::Other => Err(Error::installation(
                &task_tool,
                format!("Unsupported artifact type: {}", artifact.display()),
            )),
        })
        .await
        .map_err(|e| Error::installation(&tool, format!("Install task failed: {e}")))??;

        info!(
            %tool,
            version = %self.release.version,
            path = %self.destination.display(),
            "Installed"
        );
        Ok(())
    }
}
