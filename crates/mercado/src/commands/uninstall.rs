//! `mercado uninstall`

use crate::cli::CliError;
use mercado_core::ToolResolver;

/// Remove a managed executable.
///
/// # Errors
///
/// Returns an error if the tool is unknown, not installed, or only found on
/// `PATH`.
pub fn execute(resolver: &ToolResolver, name: &str) -> Result<String, CliError> {
    let path = resolver.uninstall(name)?;
    Ok(format!("Removed {name} from {}\n", path.display()))
}
