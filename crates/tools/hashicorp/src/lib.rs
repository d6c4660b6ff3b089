//! HashiCorp releases backend for mercado.
//!
//! Uses the public releases API:
//! - `GET /v1/releases/{product}?license_class=oss`, newest first
//! - `GET /v1/releases/{product}/{version}?license_class=oss`

use async_trait::async_trait;
use mercado_core::platform::arch_matches;
use mercado_core::select::{SelectError, choose_url};
use mercado_core::tools::{InstallOptions, Installer, Release, ReleaseBackend, Tool, ToolSource};
use mercado_core::{Error, HttpSession, Platform, Result, install};
use serde::Deserialize;
use tracing::debug;

/// Public releases API.
pub const DEFAULT_API_BASE: &str = "https://api.releases.hashicorp.com";

/// One release of a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRelease {
    /// Version without a `v` prefix.
    pub version: String,
    /// Platform builds.
    #[serde(default)]
    pub builds: Vec<Build>,
}

/// A build of a release for one platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    /// Operating system (`darwin`, `linux`, ...).
    pub os: String,
    /// Architecture (`amd64`, `arm64`, ...).
    pub arch: String,
    /// Download URL.
    pub url: String,
}

/// URLs of the builds matching `platform`.
///
/// The OS must equal one of its spellings exactly; the architecture is
/// matched with the usual normalization.
#[must_use]
pub fn matching_builds<'a>(builds: &'a [Build], platform: &Platform) -> Vec<&'a str> {
    let oses = platform.os_variations();
    builds
        .iter()
        .filter(|b| oses.iter().any(|os| os.eq_ignore_ascii_case(&b.os)))
        .filter(|b| arch_matches(&platform.arch, &b.arch))
        .map(|b| b.url.as_str())
        .collect()
}

/// Release backend over the HashiCorp releases API.
#[derive(Debug, Clone)]
pub struct HashiCorpBackend {
    session: HttpSession,
    api_base: String,
}

impl HashiCorpBackend {
    /// Create a backend on the public API.
    #[must_use]
    pub fn new(session: &HttpSession) -> Self {
        Self {
            session: session.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the backend at another API root.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn product(tool: &Tool) -> Result<&str> {
        match &tool.source {
            ToolSource::HashiCorp { product } => Ok(product.as_deref().unwrap_or(&tool.name)),
            other => Err(Error::configuration(format!(
                "{} is a {} tool, not a hashicorp tool",
                tool.name,
                other.backend_type()
            ))),
        }
    }

    async fn releases(&self, tool: &Tool) -> Result<Vec<ProductRelease>> {
        let product = Self::product(tool)?;
        let url = format!("{}/v1/releases/{product}?license_class=oss", self.api_base);
        debug!(%url, "Listing HashiCorp releases");
        match self.session.get_json::<Vec<ProductRelease>>(&url).await? {
            Some(releases) if !releases.is_empty() => Ok(releases),
            _ => Err(Error::tool_not_found(&tool.name)),
        }
    }

    async fn release_by_version(&self, tool: &Tool, version: &str) -> Result<ProductRelease> {
        let product = Self::product(tool)?;
        let url = format!(
            "{}/v1/releases/{product}/{version}?license_class=oss",
            self.api_base
        );
        debug!(%url, "Fetching HashiCorp release");
        self.session
            .get_json(&url)
            .await?
            .ok_or_else(|| Error::version_not_found(&tool.name, version))
    }

    fn to_release(tool: &Tool, release: &ProductRelease, platform: &Platform) -> Result<Release> {
        let urls = matching_builds(&release.builds, platform);
        debug!(tool = %tool.name, version = %release.version, ?urls, "Candidate builds");

        let url = choose_url(urls.as_slice()).map_err(|e| match e {
            SelectError::NoValidArtifact => {
                Error::no_artifact(&tool.name, &release.version, platform)
            }
            SelectError::Ambiguous(candidates) => {
                Error::ambiguous(&tool.name, &release.version, candidates)
            }
        })?;

        Ok(Release {
            tool: tool.name.clone(),
            version: release.version.clone(),
            platform: platform.clone(),
            url: Some(url),
        })
    }
}

#[async_trait]
impl ReleaseBackend for HashiCorpBackend {
    fn name(&self) -> &'static str {
        "hashicorp"
    }

    fn description(&self) -> &'static str {
        "Install builds listed by the HashiCorp releases API"
    }

    fn can_handle(&self, source: &ToolSource) -> bool {
        matches!(source, ToolSource::HashiCorp { .. })
    }

    async fn latest_version(&self, tool: &Tool) -> Result<String> {
        let releases = self.releases(tool).await?;
        releases
            .into_iter()
            .next()
            .map(|r| r.version)
            .ok_or_else(|| Error::tool_not_found(&tool.name))
    }

    async fn release(&self, tool: &Tool, version: &str, platform: &Platform) -> Result<Release> {
        let release = self.release_by_version(tool, version).await?;
        Self::to_release(tool, &release, platform)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn build(os: &str, arch: &str) -> Build {
        Build {
            os: os.into(),
            arch: arch.into(),
            url: format!("https://releases.example.com/vault_1.15.0_{os}_{arch}.zip"),
        }
    }

    #[test]
    fn test_matching_builds() {
        let builds = vec![
            build("darwin", "amd64"),
            build("darwin", "arm64"),
            build("linux", "amd64"),
            build("linux", "arm"),
            build("linux", "arm64"),
            build("freebsd", "amd64"),
        ];
        assert_eq!(
            matching_builds(&builds, &Platform::new("linux", "x86_64")),
            vec!["https://releases.example.com/vault_1.15.0_linux_amd64.zip"]
        );
        assert_eq!(
            matching_builds(&builds, &Platform::new("macos", "arm64")),
            vec!["https://releases.example.com/vault_1.15.0_darwin_arm64.zip"]
        );
    }

    #[test]
    fn test_os_match_is_exact() {
        let builds = vec![build("linux", "amd64")];
        assert!(matching_builds(&builds, &Platform::new("lin", "amd64")).is_empty());
    }

    #[test]
    fn test_product_defaults_to_tool_name() {
        let tool = Tool::new("terraform", ToolSource::HashiCorp { product: None });
        assert_eq!(HashiCorpBackend::product(&tool).unwrap(), "terraform");

        let tool = Tool::new(
            "tf",
            ToolSource::HashiCorp {
                product: Some("terraform".into()),
            },
        );
        assert_eq!(HashiCorpBackend::product(&tool).unwrap(), "terraform");
    }
}
