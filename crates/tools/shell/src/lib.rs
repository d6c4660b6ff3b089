//! Shell-script backend for mercado.
//!
//! Some vendors only ship an install script. The latest version comes from
//! a declared version source (a GitHub repository or a plain-text URL) and
//! installing runs the rendered script with `sh -c`.

use async_trait::async_trait;
use mercado_core::tools::{
    InstallOptions, Installer, Release, ReleaseBackend, Template, TemplateContext, Tool,
    ToolSource, VersionSource,
};
use mercado_core::{Error, HttpSession, Platform, Result, probe};
use mercado_tools_github::GitHubClient;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

struct ShellSource<'a> {
    latest: &'a VersionSource,
    script: &'a Template,
    scripts: &'a BTreeMap<String, Template>,
    env: &'a BTreeMap<String, Template>,
}

/// Release backend for script-installed tools.
#[derive(Debug, Clone)]
pub struct ShellBackend {
    session: HttpSession,
    github: GitHubClient,
}

impl ShellBackend {
    /// Create a backend.
    #[must_use]
    pub fn new(session: &HttpSession) -> Self {
        Self {
            session: session.clone(),
            github: GitHubClient::new(session),
        }
    }

    /// Point GitHub version lookups at another API root.
    #[must_use]
    pub fn with_github_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.github = self.github.with_api_base(api_base);
        self
    }

    fn source(tool: &Tool) -> Result<ShellSource<'_>> {
        match &tool.source {
            ToolSource::Shell {
                latest,
                script,
                scripts,
                env,
            } => Ok(ShellSource {
                latest,
                script,
                scripts,
                env,
            }),
            other => Err(Error::configuration(format!(
                "{} is a {} tool, not a shell tool",
                tool.name,
                other.backend_type()
            ))),
        }
    }
}

#[async_trait]
impl ReleaseBackend for ShellBackend {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn description(&self) -> &'static str {
        "Install tools by running their vendor install script"
    }

    fn can_handle(&self, source: &ToolSource) -> bool {
        matches!(source, ToolSource::Shell { .. })
    }

    async fn latest_version(&self, tool: &Tool) -> Result<String> {
        match Self::source(tool)?.latest {
            VersionSource::GitHub { repository } => Ok(self
                .github
                .latest_release(&tool.name, repository)
                .await?
                .tag_name),
            VersionSource::Url { url } => {
                let version = self.session.get_text(url).await?;
                if version.is_empty() {
                    return Err(Error::upstream(url, "Empty version response"));
                }
                Ok(version)
            }
        }
    }

    async fn release(&self, tool: &Tool, version: &str, platform: &Platform) -> Result<Release> {
        match Self::source(tool)?.latest {
            VersionSource::GitHub { repository } => {
                self.github
                    .release_by_tag(&tool.name, repository, version)
                    .await?;
            }
            VersionSource::Url { .. } => {
                // A plain-text source only publishes its latest version.
                let latest = self.latest_version(tool).await?;
                if !probe::same_version(version, &latest) {
                    debug!(
                        tool = %tool.name,
                        version,
                        %latest,
                        "Pin does not match the published version"
                    );
                    return Err(Error::version_not_found(&tool.name, version));
                }
            }
        }
        Ok(Release {
            tool: tool.name.clone(),
            version: version.to_string(),
            platform: platform.clone(),
            url: None,
        })
    }

    fn installer(
        &self,
        tool: &Tool,
        release: Release,
        options: &InstallOptions,
    ) -> Result<Box<dyn Installer>> {
        Ok(Box::new(ScriptInstaller::new(tool, release, options)?))
    }
}

/// Runs a rendered install script.
#[derive(Debug)]
pub struct ScriptInstaller {
    release: Release,
    script: String,
    env: Vec<(String, String)>,
    install_dir: PathBuf,
    destination: PathBuf,
}

impl ScriptInstaller {
    /// Render the tool's script (the per-OS override when one exists) and
    /// environment for `release`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the tool is not a shell tool.
    pub fn new(tool: &Tool, release: Release, options: &InstallOptions) -> Result<Self> {
        let source = ShellBackend::source(tool)?;
        let template = release
            .platform
            .os_variations()
            .iter()
            .find_map(|os| source.scripts.get(os))
            .unwrap_or(source.script);
        let ctx = TemplateContext::new(&tool.name, &release.version, &release.platform)
            .with_install_dir(&options.install_dir);

        let script = template.render(&ctx);
        let env = source
            .env
            .iter()
            .map(|(key, value)| (key.clone(), value.render(&ctx)))
            .collect();

        Ok(Self {
            script,
            env,
            install_dir: options.install_dir.clone(),
            destination: tool.install_path(&options.install_dir),
            release,
        })
    }

    /// The rendered script body.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    fn search_path(&self) -> String {
        let install_dir = self.install_dir.display().to_string();
        match std::env::var("PATH") {
            Ok(path) if !path.is_empty() => format!("{path}:{install_dir}"),
            _ => install_dir,
        }
    }
}

#[async_trait]
impl Installer for ScriptInstaller {
    fn release(&self) -> &Release {
        &self.release
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    async fn install(&self) -> Result<()> {
        let tool = &self.release.tool;
        std::fs::create_dir_all(&self.install_dir).map_err(|e| {
            Error::io(e, Some(self.install_dir.clone()), "create install directory")
        })?;
        let work_dir = tempfile::tempdir()
            .map_err(|e| Error::io(e, None, "create temporary directory"))?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("set -o errexit\n{}", self.script))
            .current_dir(work_dir.path())
            .env_clear()
            .env("PATH", self.search_path())
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        info!(%tool, version = %self.release.version, "Running install script");
        debug!(%tool, script = %self.script, "Install script");

        let output = cmd
            .output()
            .await
            .map_err(|e| Error::io(e, None, "run install script"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::installation(
                tool,
                format!("Install script exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        info!(%tool, version = %self.release.version, "Install script finished");
        Ok(())
    }
}
