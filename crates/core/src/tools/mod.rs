//! Tool model and release backends.
//!
//! # Architecture
//!
//! - [`Tool`] - A catalog entry with its [`ToolSource`]
//! - [`ReleaseBackend`] - Trait implemented by each source (GitHub, HashiCorp, ...)
//! - [`BackendRegistry`] - Collection of registered backends
//! - [`Release`] - An installable reference for one version and platform
//! - [`Installer`] - One-shot installation of a release
//!
//! # Example
//!
//! ```ignore
//! use mercado_core::tools::BackendRegistry;
//!
//! let mut registry = BackendRegistry::new();
//! registry.register(GitHubBackend::new(&session));
//!
//! let backend = registry.find_for_source(&tool.source).unwrap();
//! let release = backend.latest_release(&tool, &Platform::current()).await?;
//! backend.installer(&tool, release, &options)?.install().await?;
//! ```

mod provider;
mod registry;

pub use provider::{
    InstallOptions, Installer, Label, Release, ReleaseBackend, Template, TemplateContext, Tool,
    ToolSource, VersionSource,
};
pub use registry::BackendRegistry;
