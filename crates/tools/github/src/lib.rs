//! GitHub Releases backend for mercado.
//!
//! Resolves tools published as GitHub release assets:
//! - `GET /repos/{repo}/releases/latest` for the newest release
//! - `GET /repos/{repo}/releases/tags/{tag}` for a pinned one
//! - Asset matching by an optional name template (`{version}`, `{os}`,
//!   `{arch}`), else by tool name plus OS and architecture tokens

use async_trait::async_trait;
use mercado_core::platform::{arch_matches, os_matches};
use mercado_core::select::{SelectError, choose_url};
use mercado_core::tools::{
    InstallOptions, Installer, Release, ReleaseBackend, Template, TemplateContext, Tool,
    ToolSource,
};
use mercado_core::{Error, HttpSession, Platform, Result, config, install};
use serde::Deserialize;
use tracing::debug;

/// Public GitHub API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// GitHub release metadata from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    /// Release tag, used as the version.
    pub tag_name: String,
    /// Uploaded assets.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// GitHub release asset.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    /// File name.
    pub name: String,
    /// Public download URL.
    pub browser_download_url: String,
}

/// Client for the release endpoints of the GitHub API.
///
/// Shared by the GitHub backend and the shell backend's version lookup.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    session: HttpSession,
    api_base: String,
}

impl GitHubClient {
    /// Create a client on the public API, authenticated with
    /// `GITHUB_TOKEN`/`GH_TOKEN` when set.
    #[must_use]
    pub fn new(session: &HttpSession) -> Self {
        Self {
            session: session.with_bearer(config::github_token()),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the client at another API root.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Newest release of `repository`.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] on 404.
    pub async fn latest_release(&self, tool: &str, repository: &str) -> Result<GitHubRelease> {
        let url = format!("{}/repos/{repository}/releases/latest", self.api_base);
        debug!(%url, "Fetching latest GitHub release");
        self.session
            .get_json(&url)
            .await?
            .ok_or_else(|| Error::tool_not_found(tool))
    }

    /// Release tagged `tag` in `repository`.
    ///
    /// # Errors
    ///
    /// [`Error::VersionNotFound`] on 404.
    pub async fn release_by_tag(
        &self,
        tool: &str,
        repository: &str,
        tag: &str,
    ) -> Result<GitHubRelease> {
        let url = format!("{}/repos/{repository}/releases/tags/{tag}", self.api_base);
        debug!(%url, "Fetching GitHub release");
        self.session
            .get_json(&url)
            .await?
            .ok_or_else(|| Error::version_not_found(tool, tag))
    }
}

/// Assets of `release` matching `platform`.
///
/// With a template, assets whose name equals (case-insensitively) a
/// rendering for any architecture spelling are preferred. Otherwise, or if
/// none matches, assets naming the tool, the OS and the architecture are
/// kept.
#[must_use]
pub fn matching_assets<'a>(
    tool: &str,
    template: Option<&Template>,
    release: &'a GitHubRelease,
    platform: &Platform,
) -> Vec<&'a Asset> {
    if let Some(template) = template {
        let arches = platform.arch_variations();
        let renderings: Vec<String> = arches
            .iter()
            .map(|arch| {
                template.render(
                    &TemplateContext::new(tool, &release.tag_name, platform).with_arch(arch),
                )
            })
            .collect();
        debug!(tool, ?renderings, "Asset template renderings");

        let exact: Vec<&Asset> = release
            .assets
            .iter()
            .filter(|asset| {
                renderings
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(&asset.name))
            })
            .collect();
        if !exact.is_empty() {
            return exact;
        }
    }

    let tool_lower = tool.to_lowercase();
    release
        .assets
        .iter()
        .filter(|asset| {
            asset.name.to_lowercase().contains(&tool_lower)
                && os_matches(&platform.os, &asset.name)
                && arch_matches(&platform.arch, &asset.name)
        })
        .collect()
}

/// Release backend over GitHub Releases.
#[derive(Debug, Clone)]
pub struct GitHubBackend {
    client: GitHubClient,
    session: HttpSession,
}

impl GitHubBackend {
    /// Create a backend on the public API.
    #[must_use]
    pub fn new(session: &HttpSession) -> Self {
        Self {
            client: GitHubClient::new(session),
            session: session.clone(),
        }
    }

    /// Point the backend at another API root.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.client = self.client.with_api_base(api_base);
        self
    }

    fn source(tool: &Tool) -> Result<(&str, Option<&Template>)> {
        match &tool.source {
            ToolSource::GitHub { repository, asset } => Ok((repository, asset.as_ref())),
            other => Err(Error::configuration(format!(
                "{} is a {} tool, not a github tool",
                tool.name,
                other.backend_type()
            ))),
        }
    }

    fn to_release(
        tool: &Tool,
        template: Option<&Template>,
        release: &GitHubRelease,
        platform: &Platform,
    ) -> Result<Release> {
        let assets = matching_assets(&tool.name, template, release, platform);
        let urls: Vec<&str> = assets
            .iter()
            .map(|a| a.browser_download_url.as_str())
            .collect();
        debug!(tool = %tool.name, version = %release.tag_name, ?urls, "Candidate assets");

        let url = choose_url(urls.as_slice()).map_err(|e| match e {
            SelectError::NoValidArtifact => {
                Error::no_artifact(&tool.name, &release.tag_name, platform)
            }
            SelectError::Ambiguous(candidates) => {
                Error::ambiguous(&tool.name, &release.tag_name, candidates)
            }
        })?;

        Ok(Release {
            tool: tool.name.clone(),
            version: release.tag_name.clone(),
            platform: platform.clone(),
            url: Some(url),
        })
    }
}

#[async_trait]
impl ReleaseBackend for GitHubBackend {
    fn name(&self) -> &'static str {
        "github"
    }

    fn description(&self) -> &'static str {
        "Install assets from GitHub releases"
    }

    fn can_handle(&self, source: &ToolSource) -> bool {
        matches!(source, ToolSource::GitHub { .. })
    }

    async fn latest_version(&self, tool: &Tool) -> Result<String> {
        let (repository, _) = Self::source(tool)?;
        Ok(self
            .client
            .latest_release(&tool.name, repository)
            .await?
            .tag_name)
    }

    async fn release(&self, tool: &Tool, version: &str, platform: &Platform) -> Result<Release> {
        let (repository, template) = Self::source(tool)?;
        let release = self
            .client
            .release_by_tag(&tool.name, repository, version)
            .await?;
        Self::to_release(tool, template, &release, platform)
    }

    // One request instead of latest_version + release.
    async fn latest_release(&self, tool: &Tool, platform: &Platform) -> Result<Release> {
        let (repository, template) = Self::source(tool)?;
        let release = self.client.latest_release(&tool.name, repository).await?;
        Self::to_release(tool, template, &release, platform)
    }

    fn installer(
        &self,
        tool: &Tool,
        release: Release,
        options: &InstallOptions,
    ) -> Result<Box<dyn Installer>> {
        install::download_installer(&self.session, tool, release, options)
    }
}
