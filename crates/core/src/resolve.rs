//! Tool resolution service.
//!
//! [`ToolResolver`] is the single entry point: it splits `name@version`
//! requests, looks the tool up in the [`Catalog`] and dispatches to the
//! backend owning the tool's source. Releases are memoized for the lifetime
//! of the resolver.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::platform::Platform;
use crate::probe::{self, LocalVersion, Location};
use crate::tools::{BackendRegistry, InstallOptions, Installer, Release, ReleaseBackend, Tool};
use crate::{Error, Result};

const LATEST: &str = "latest";

/// A parsed `name[@version]` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// Catalog name.
    pub name: String,
    /// Pinned version, `None` for the latest release.
    pub version: Option<String>,
}

impl ToolRequest {
    /// Split on the first `@`. A pin of `latest` means no pin.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty name or empty pin.
    pub fn parse(request: &str) -> Result<Self> {
        let request = request.trim();
        let (name, version) = match request.split_once('@') {
            Some((name, version)) => (name, Some(version)),
            None => (request, None),
        };
        if name.is_empty() {
            return Err(Error::configuration(format!(
                "Invalid request '{request}': missing tool name"
            )));
        }
        let version = match version {
            Some("") => {
                return Err(Error::configuration_with_help(
                    format!("Invalid request '{request}': empty version"),
                    "Use NAME or NAME@VERSION",
                ));
            }
            Some(LATEST) | None => None,
            Some(v) => Some(v.to_string()),
        };
        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl std::fmt::Display for ToolRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    tool: String,
    version: String,
    os: String,
    arch: String,
}

impl MemoKey {
    fn new(tool: &str, version: &str, platform: &Platform) -> Self {
        Self {
            tool: tool.to_string(),
            version: version.to_string(),
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        }
    }
}

/// Local state of a tool compared with upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    /// Tool name.
    pub tool: String,
    /// Local installation.
    pub local: LocalVersion,
    /// Latest upstream version.
    pub latest: String,
}

impl Freshness {
    /// Whether the local installation differs from the latest release.
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        !probe::same_version(&self.local.version, &self.latest)
    }
}

/// Single entry point for resolving, installing and inspecting tools.
pub struct ToolResolver {
    catalog: Catalog,
    registry: BackendRegistry,
    options: InstallOptions,
    memo: Mutex<HashMap<MemoKey, Release>>,
}

impl ToolResolver {
    /// Create a resolver over an explicit catalog and backend set.
    #[must_use]
    pub fn new(catalog: Catalog, registry: BackendRegistry, options: InstallOptions) -> Self {
        Self {
            catalog,
            registry,
            options,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// The catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Installation options.
    #[must_use]
    pub const fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Look up a tool by name (without version).
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] when the catalog has no such tool.
    pub fn tool(&self, name: &str) -> Result<&Tool> {
        self.catalog
            .get(name)
            .ok_or_else(|| Error::tool_not_found(name))
    }

    fn backend(&self, tool: &Tool) -> Result<&Arc<dyn ReleaseBackend>> {
        self.registry.find_for_source(&tool.source).ok_or_else(|| {
            Error::configuration(format!(
                "No backend registered for '{}' sources (tool {})",
                tool.source.backend_type(),
                tool.name
            ))
        })
    }

    fn memoized(&self, key: &MemoKey) -> Option<Release> {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remember(&self, key: MemoKey, release: &Release) {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, release.clone());
    }

    /// Resolve `name[@version]` for a platform.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`], [`Error::VersionNotFound`],
    /// [`Error::NoArtifactForPlatform`], [`Error::AmbiguousArtifact`] or
    /// [`Error::UpstreamUnavailable`].
    pub async fn resolve(&self, request: &str, platform: &Platform) -> Result<Release> {
        let request = ToolRequest::parse(request)?;
        let tool = self.tool(&request.name)?;
        let backend = self.backend(tool)?;

        let key = MemoKey::new(
            &tool.name,
            request.version.as_deref().unwrap_or(LATEST),
            platform,
        );
        if let Some(release) = self.memoized(&key) {
            debug!(tool = %tool.name, version = %release.version, %platform, "Release memoized");
            return Ok(release);
        }

        let release = match &request.version {
            Some(version) => backend.release(tool, version, platform).await?,
            None => {
                let release = backend.latest_release(tool, platform).await?;
                self.remember(
                    MemoKey::new(&tool.name, &release.version, platform),
                    &release,
                );
                release
            }
        };
        self.remember(key, &release);

        info!(
            tool = %tool.name,
            version = %release.version,
            %platform,
            url = release.url.as_deref().unwrap_or("<script>"),
            "Resolved release"
        );
        Ok(release)
    }

    /// Resolve `name[@version]` and return its installer.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub async fn installer(
        &self,
        request: &str,
        platform: &Platform,
    ) -> Result<Box<dyn Installer>> {
        let release = self.resolve(request, platform).await?;
        let tool = self.tool(&release.tool)?;
        self.backend(tool)?.installer(tool, release, &self.options)
    }

    /// Latest upstream version of a tool.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] or [`Error::UpstreamUnavailable`].
    pub async fn latest_version(&self, name: &str) -> Result<String> {
        let request = ToolRequest::parse(name)?;
        let tool = self.tool(&request.name)?;
        self.backend(tool)?.latest_version(tool).await
    }

    /// Locally installed version of a tool.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`], [`Error::NotInstalled`] or
    /// [`Error::VersionUnparseable`].
    pub fn local_version(&self, name: &str) -> Result<LocalVersion> {
        let request = ToolRequest::parse(name)?;
        let tool = self.tool(&request.name)?;
        probe::local_version(tool, &self.options.install_dir)
    }

    /// Compare the local installation of a tool with its latest release.
    ///
    /// # Errors
    ///
    /// See [`local_version`](Self::local_version) and
    /// [`latest_version`](Self::latest_version).
    pub async fn freshness(&self, name: &str) -> Result<Freshness> {
        let local = self.local_version(name)?;
        let latest = self.latest_version(name).await?;
        Ok(Freshness {
            tool: name.to_string(),
            local,
            latest,
        })
    }

    /// Names of catalog tools with a local executable.
    #[must_use]
    pub fn installed(&self) -> Vec<&Tool> {
        self.catalog
            .iter()
            .filter(|tool| probe::locate(tool, &self.options.install_dir).is_some())
            .collect()
    }

    /// Remove a tool's executable from the managed install directory or its
    /// declared target.
    ///
    /// # Errors
    ///
    /// [`Error::NotInstalled`] when nothing is installed, a configuration
    /// error when the executable was only found on the search path.
    pub fn uninstall(&self, name: &str) -> Result<PathBuf> {
        let tool = self.tool(name)?;
        let (path, location) = probe::locate(tool, &self.options.install_dir)
            .ok_or_else(|| Error::not_installed(&tool.name))?;

        if location == Location::SearchPath {
            return Err(Error::configuration_with_help(
                format!(
                    "{} at {} is not managed by mercado",
                    tool.name,
                    path.display()
                ),
                "Only binaries in the install directory or the tool's target are removed",
            ));
        }

        std::fs::remove_file(&path)
            .map_err(|e| Error::io(e, Some(path.clone()), "remove executable"))?;
        info!(tool = %tool.name, path = %path.display(), "Uninstalled");
        Ok(path)
    }
}

impl std::fmt::Debug for ToolResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolResolver")
            .field("tools", &self.catalog.len())
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
