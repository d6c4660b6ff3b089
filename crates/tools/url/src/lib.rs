//! Generic URL-pattern backend for mercado.
//!
//! For vendors without a listing API. The latest version is the body of a
//! plain-text endpoint; downloads come from a URL template probed with
//! `HEAD` for every spelling of the platform's OS and architecture.

use async_trait::async_trait;
use mercado_core::tools::{
    InstallOptions, Installer, Release, ReleaseBackend, Template, TemplateContext, Tool,
    ToolSource,
};
use mercado_core::{Error, HttpSession, Platform, Result, install};
use tracing::debug;

/// Every rendering of `template` for `platform`, in probe order.
///
/// OS spellings vary slowest; duplicates are dropped.
#[must_use]
pub fn candidate_urls(
    name: &str,
    template: &Template,
    version: &str,
    platform: &Platform,
) -> Vec<String> {
    let arches = platform.arch_variations();
    let mut urls: Vec<String> = Vec::new();
    for os in platform.os_variations() {
        for arch in &arches {
            let ctx = TemplateContext::new(name, version, platform)
                .with_os(&os)
                .with_arch(arch);
            let url = template.render(&ctx);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// Release backend over URL templates.
#[derive(Debug, Clone)]
pub struct UrlBackend {
    session: HttpSession,
}

impl UrlBackend {
    /// Create a backend.
    #[must_use]
    pub fn new(session: &HttpSession) -> Self {
        Self {
            session: session.clone(),
        }
    }

    fn source(tool: &Tool) -> Result<(&str, &Template)> {
        match &tool.source {
            ToolSource::Url {
                latest_version_url,
                url,
                ..
            } => Ok((latest_version_url, url)),
            other => Err(Error::configuration(format!(
                "{} is a {} tool, not a url tool",
                tool.name,
                other.backend_type()
            ))),
        }
    }
}

#[async_trait]
impl ReleaseBackend for UrlBackend {
    fn name(&self) -> &'static str {
        "url"
    }

    fn description(&self) -> &'static str {
        "Install binaries from templated download URLs"
    }

    fn can_handle(&self, source: &ToolSource) -> bool {
        matches!(source, ToolSource::Url { .. })
    }

    async fn latest_version(&self, tool: &Tool) -> Result<String> {
        let (latest_version_url, _) = Self::source(tool)?;
        let version = self.session.get_text(latest_version_url).await?;
        if version.is_empty() {
            return Err(Error::upstream(latest_version_url, "Empty version response"));
        }
        Ok(version)
    }

    async fn release(&self, tool: &Tool, version: &str, platform: &Platform) -> Result<Release> {
        let (_, template) = Self::source(tool)?;

        for url in candidate_urls(&tool.name, template, version, platform) {
            let status = self.session.head(&url).await?;
            debug!(tool = %tool.name, %url, %status, "Probed candidate URL");
            if status.is_success() {
                return Ok(Release {
                    tool: tool.name.clone(),
                    version: version.to_string(),
                    platform: platform.clone(),
                    url: Some(url),
                });
            }
            if status.as_u16() != 404 {
                return Err(Error::upstream(url, format!("HTTP {status}")));
            }
        }

        Err(Error::no_artifact(&tool.name, version, platform))
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
