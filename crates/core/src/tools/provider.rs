//! Tool model and the release backend trait.
//!
//! A [`Tool`] is one catalog entry: a name, descriptive labels, an optional
//! fixed install location and a [`ToolSource`] saying which backend owns it.
//! Backends implement [`ReleaseBackend`] and turn a tool plus a version and
//! [`Platform`] into a [`Release`], and a release into an [`Installer`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::platform::Platform;
use crate::{Error, Result};

/// A string with `{name}`, `{version}`, `{os}`, `{arch}` and
/// `{install_dir}` placeholders.
///
/// Unknown placeholders are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    /// Create a template from its raw text.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute every known placeholder.
    #[must_use]
    pub fn render(&self, ctx: &TemplateContext<'_>) -> String {
        let install_dir = ctx
            .install_dir
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        self.0
            .replace("{name}", ctx.name)
            .replace("{version}", ctx.version)
            .replace("{os}", ctx.os)
            .replace("{arch}", ctx.arch)
            .replace("{install_dir}", &install_dir)
    }
}

impl From<&str> for Template {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Values substituted into a [`Template`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContext<'a> {
    /// Tool name.
    pub name: &'a str,
    /// Version string, as published upstream.
    pub version: &'a str,
    /// OS token.
    pub os: &'a str,
    /// Architecture token.
    pub arch: &'a str,
    /// Install directory.
    pub install_dir: Option<&'a Path>,
}

impl<'a> TemplateContext<'a> {
    /// Context for a tool, version and platform.
    #[must_use]
    pub fn new(name: &'a str, version: &'a str, platform: &'a Platform) -> Self {
        Self {
            name,
            version,
            os: &platform.os,
            arch: &platform.arch,
            install_dir: None,
        }
    }

    /// Override the OS token.
    #[must_use]
    pub const fn with_os(mut self, os: &'a str) -> Self {
        self.os = os;
        self
    }

    /// Override the architecture token.
    #[must_use]
    pub const fn with_arch(mut self, arch: &'a str) -> Self {
        self.arch = arch;
        self
    }

    /// Set the install directory.
    #[must_use]
    pub const fn with_install_dir(mut self, dir: &'a Path) -> Self {
        self.install_dir = Some(dir);
        self
    }
}

/// Descriptive category of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Kubernetes tooling.
    K8s,
    /// Version control.
    Vcs,
    /// Signing, scanning and secrets.
    Security,
    /// Infrastructure as code.
    Iac,
    /// Virtual machines.
    Virtualization,
    /// CI/CD.
    Cicd,
    /// Container tooling.
    Containers,
}

impl Label {
    /// All labels, in display order.
    pub const ALL: [Self; 7] = [
        Self::K8s,
        Self::Vcs,
        Self::Security,
        Self::Iac,
        Self::Virtualization,
        Self::Cicd,
        Self::Containers,
    ];

    /// Lowercase name as used in catalogs and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::K8s => "k8s",
            Self::Vcs => "vcs",
            Self::Security => "security",
            Self::Iac => "iac",
            Self::Virtualization => "virtualization",
            Self::Cicd => "cicd",
            Self::Containers => "containers",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|l| l.as_str()).collect();
                Error::configuration_with_help(
                    format!("Unknown label '{s}'"),
                    format!("Known labels: {}", known.join(", ")),
                )
            })
    }
}

/// Where the latest version of a scripted tool is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VersionSource {
    /// The latest release of a GitHub repository.
    GitHub {
        /// `owner/repo`.
        repository: String,
    },
    /// The trimmed body of a plain-text endpoint.
    Url {
        /// The endpoint.
        url: String,
    },
}

/// Backend-specific data of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolSource {
    /// Assets of GitHub releases.
    GitHub {
        /// `owner/repo`.
        repository: String,
        /// Asset name template, when name heuristics are not enough.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<Template>,
    },
    /// Builds listed by the HashiCorp releases API.
    HashiCorp {
        /// Product name, defaults to the tool name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product: Option<String>,
    },
    /// A URL pattern without a listing endpoint.
    Url {
        /// Plain-text endpoint whose body is the latest version.
        latest_version_url: String,
        /// Download URL template.
        url: Template,
        /// Executable name inside the download, defaults to the tool name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        binary: Option<String>,
    },
    /// A vendor install script.
    Shell {
        /// Where to look up the latest version.
        latest: VersionSource,
        /// Install script template.
        script: Template,
        /// Per-OS script overrides.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        scripts: BTreeMap<String, Template>,
        /// Extra environment for the script. Values are templates.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, Template>,
    },
}

impl ToolSource {
    /// Get the backend type name.
    #[must_use]
    pub const fn backend_type(&self) -> &'static str {
        match self {
            Self::GitHub { .. } => "github",
            Self::HashiCorp { .. } => "hashicorp",
            Self::Url { .. } => "url",
            Self::Shell { .. } => "shell",
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique catalog key.
    pub name: String,
    /// Descriptive categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    /// Fixed installation path, overriding `install_dir/name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// Owning backend and its metadata.
    pub source: ToolSource,
}

impl Tool {
    /// Create a tool without labels or target.
    #[must_use]
    pub fn new(name: impl Into<String>, source: ToolSource) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            target: None,
            source,
        }
    }

    /// Add labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = Label>) -> Self {
        self.labels.extend(labels);
        self
    }

    /// Set a fixed install path.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Whether the tool carries `label`.
    #[must_use]
    pub fn has_label(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    /// Name of the executable inside a downloaded archive or image.
    #[must_use]
    pub fn binary_name(&self) -> &str {
        match &self.source {
            ToolSource::Url {
                binary: Some(binary),
                ..
            } => binary,
            _ => &self.name,
        }
    }

    /// Where the executable is placed: the declared target, else
    /// `install_dir/name`.
    #[must_use]
    pub fn install_path(&self, install_dir: &Path) -> PathBuf {
        self.target
            .clone()
            .unwrap_or_else(|| install_dir.join(&self.name))
    }
}

/// An installable reference produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Tool name.
    pub tool: String,
    /// Resolved version, as published upstream.
    pub version: String,
    /// Platform the release was resolved for.
    pub platform: Platform,
    /// Download URL, `None` for scripted installs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Options for installation.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Directory receiving executables.
    pub install_dir: PathBuf,
}

impl InstallOptions {
    /// Create options installing into `install_dir`.
    #[must_use]
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }
}

/// One-shot installation of a single release.
#[async_trait]
pub trait Installer: Send + Sync {
    /// The release being installed.
    fn release(&self) -> &Release;

    /// Where the executable ends up.
    fn destination(&self) -> &Path;

    /// Perform the installation.
    ///
    /// # Errors
    ///
    /// Returns an error if downloading, unpacking, placing the binary or
    /// running the install script fails.
    async fn install(&self) -> Result<()>;
}

/// A release source (GitHub, HashiCorp, URL pattern, shell script).
///
/// Backends are registered in a [`BackendRegistry`](super::BackendRegistry)
/// and selected by the tool's [`ToolSource`].
#[async_trait]
pub trait ReleaseBackend: Send + Sync {
    /// Backend name, matching the `type` of the catalog source.
    fn name(&self) -> &'static str;

    /// Human-readable description for help text.
    fn description(&self) -> &'static str;

    /// Check if this backend owns the given source type.
    fn can_handle(&self, source: &ToolSource) -> bool;

    /// Latest published version.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] when upstream does not know the tool.
    async fn latest_version(&self, tool: &Tool) -> Result<String>;

    /// Release of a specific version for a platform.
    ///
    /// # Errors
    ///
    /// [`Error::VersionNotFound`] when the version does not exist,
    /// [`Error::NoArtifactForPlatform`] when nothing matches the platform.
    async fn release(&self, tool: &Tool, version: &str, platform: &Platform) -> Result<Release>;

    /// Release of the latest version for a platform.
    ///
    /// # Errors
    ///
    /// See [`latest_version`](Self::latest_version) and
    /// [`release`](Self::release).
    async fn latest_release(&self, tool: &Tool, platform: &Platform) -> Result<Release> {
        let version = self.latest_version(tool).await?;
        self.release(tool, &version, platform).await
    }

    /// Installer bound to `release`.
    ///
    /// # Errors
    ///
    /// Returns an error if the release cannot be installed by this backend.
    fn installer(
        &self,
        tool: &Tool,
        release: Release,
        options: &InstallOptions,
    ) -> Result<Box<dyn Installer>>;
}
