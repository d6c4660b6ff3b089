//! `mercado latest`, `mercado version` and `mercado outdated`

use crate::cli::CliError;
use mercado_core::{Freshness, ToolResolver};
use std::fmt::Write;
use tracing::warn;

/// Latest upstream version of a tool.
///
/// # Errors
///
/// Returns an error if the tool is unknown or upstream fails.
pub async fn latest(resolver: &ToolResolver, name: &str) -> Result<String, CliError> {
    let version = resolver.latest_version(name).await?;
    Ok(format!("{version}\n"))
}

/// Locally installed version of a tool.
///
/// # Errors
///
/// Returns an error if the tool is unknown, not installed, or its version
/// cannot be read.
pub fn version(resolver: &ToolResolver, name: &str) -> Result<String, CliError> {
    let local = resolver.local_version(name)?;
    Ok(format!("{}\n", local.version))
}

/// Compare local installations with the latest releases.
///
/// Named tools stop at the first error. Without names every installed
/// catalog tool is checked; a tool that fails is reported on its own line
/// and the sweep continues.
///
/// # Errors
///
/// Returns the first lookup error for an explicitly named tool.
pub async fn outdated(resolver: &ToolResolver, names: &[String]) -> Result<String, CliError> {
    let mut out = String::new();

    if !names.is_empty() {
        for name in names {
            let freshness = resolver.freshness(name).await?;
            write_freshness(&mut out, &freshness);
        }
        return Ok(out);
    }

    for tool in resolver.installed() {
        match resolver.freshness(&tool.name).await {
            Ok(freshness) => write_freshness(&mut out, &freshness),
            Err(err) => {
                warn!(tool = %tool.name, error = %err, "Could not check tool");
                let _ = writeln!(out, "{} error: {err}", tool.name);
            }
        }
    }
    Ok(out)
}

fn write_freshness(out: &mut String, freshness: &Freshness) {
    if freshness.is_outdated() {
        let _ = writeln!(
            out,
            "{} {} -> {}",
            freshness.tool, freshness.local.version, freshness.latest
        );
    } else {
        let _ = writeln!(
            out,
            "{} {} (up to date)",
            freshness.tool, freshness.local.version
        );
    }
}
