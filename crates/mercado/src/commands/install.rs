//! `mercado install`

use crate::cli::CliError;
use mercado_core::{Platform, ToolResolver};
use std::fmt::Write;
use tracing::info;

/// Resolve and install each request in turn.
///
/// With `dry_run` the releases are resolved and reported but nothing is
/// downloaded or run. Stops at the first failure.
///
/// # Errors
///
/// Returns the first resolution or installation error.
pub async fn execute(
    resolver: &ToolResolver,
    requests: &[String],
    platform: &Platform,
    dry_run: bool,
) -> Result<String, CliError> {
    let mut out = String::new();

    for request in requests {
        let installer = resolver.installer(request, platform).await?;
        let release = installer.release();
        let destination = installer.destination();

        if dry_run {
            let source = release.url.as_deref().unwrap_or("install script");
            let _ = writeln!(
                out,
                "Would install {} {} ({platform}) from {source} to {}",
                release.tool,
                release.version,
                destination.display()
            );
            continue;
        }

        installer.install().await?;
        info!(
            tool = %release.tool,
            version = %release.version,
            destination = %destination.display(),
            "Installed"
        );
        let _ = writeln!(
            out,
            "Installed {} {} to {}",
            release.tool,
            release.version,
            destination.display()
        );
    }

    Ok(out)
}
