//! Command implementations.
//!
//! Each command returns the text to print on stdout; errors are rendered by
//! the caller.

pub mod inspect;
pub mod install;
pub mod list;
pub mod uninstall;

use crate::catalog;
use crate::cli::{Cli, CliError, Commands};
use mercado_core::tools::{BackendRegistry, InstallOptions};
use mercado_core::{HttpSession, Platform, Settings, ToolResolver};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create a backend registry with every built-in backend.
#[must_use]
pub fn create_registry(session: &HttpSession) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(mercado_tools_github::GitHubBackend::new(session));
    registry.register(mercado_tools_hashicorp::HashiCorpBackend::new(session));
    registry.register(mercado_tools_url::UrlBackend::new(session));
    registry.register(mercado_tools_shell::ShellBackend::new(session));
    registry
}

/// Build the resolver from settings, the catalog and the install directory
/// override.
///
/// # Errors
///
/// Returns a configuration error if the settings or a catalog cannot be
/// loaded.
pub fn create_resolver(
    config: Option<&Path>,
    install_dir: Option<PathBuf>,
) -> Result<ToolResolver, CliError> {
    let settings = Settings::load(config)?;
    let install_dir = install_dir.unwrap_or_else(|| settings.install_dir());
    let catalog = catalog::load(&settings)?;
    let session = HttpSession::new(&settings.http)?;

    debug!(
        install_dir = %install_dir.display(),
        tools = catalog.len(),
        "Resolver configured"
    );
    Ok(ToolResolver::new(
        catalog,
        create_registry(&session),
        InstallOptions::new(install_dir),
    ))
}

/// The requested platform: this host unless overridden.
#[must_use]
pub fn target_platform(os: Option<String>, arch: Option<String>) -> Platform {
    let host = Platform::current();
    Platform::new(os.unwrap_or(host.os), arch.unwrap_or(host.arch))
}

/// Run a parsed command line.
///
/// # Errors
///
/// Returns the command's error, mapped to a [`CliError`].
pub async fn execute(cli: Cli) -> Result<String, CliError> {
    let resolver = create_resolver(cli.config.as_deref(), cli.install_dir)?;

    match cli.command {
        Commands::List { label } => Ok(list::execute(resolver.catalog(), label)),
        Commands::Install {
            tools,
            os,
            arch,
            dry_run,
        } => {
            let platform = target_platform(os, arch);
            install::execute(&resolver, &tools, &platform, dry_run).await
        }
        Commands::Latest { name } => inspect::latest(&resolver, &name).await,
        Commands::Version { name } => inspect::version(&resolver, &name),
        Commands::Outdated { names } => inspect::outdated(&resolver, &names).await,
        Commands::Uninstall { name } => uninstall::execute(&resolver, &name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_backend() {
        let session = HttpSession::new(&mercado_core::config::HttpConfig::default()).unwrap();
        let registry = create_registry(&session);
        assert_eq!(registry.names(), vec!["github", "hashicorp", "shell", "url"]);
    }

    #[test]
    fn test_target_platform_overrides() {
        let platform = target_platform(Some("Darwin".into()), Some("arm64".into()));
        assert_eq!(platform, Platform::new("darwin", "arm64"));

        let host = target_platform(None, None);
        assert_eq!(host, Platform::current());
    }
}
