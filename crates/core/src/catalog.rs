//! The tool catalog.
//!
//! A catalog is an immutable list of [`Tool`] entries read from TOML:
//!
//! ```toml
//! [[tools]]
//! name = "kind"
//! labels = ["k8s"]
//! source = { type = "github", repository = "kubernetes-sigs/kind" }
//! ```
//!
//! When two entries share a name the first one wins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::tools::{Label, Tool};
use crate::{Error, Result};

/// An immutable, ordered set of tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    tools: Vec<Tool>,
}

impl Catalog {
    /// Build a catalog from tools, in priority order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a name is empty or contains `@`.
    pub fn new(tools: Vec<Tool>) -> Result<Self> {
        for tool in &tools {
            validate_name(&tool.name)?;
        }
        Ok(Self { tools })
    }

    /// Parse a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on invalid TOML or invalid names.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: Self = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Invalid catalog: {e}")))?;
        Self::new(parsed.tools)
    }

    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read catalog"))?;
        let catalog = Self::from_toml_str(&content).map_err(|e| match e {
            Error::Configuration { message, help } => Error::Configuration {
                message: format!("{}: {message}", path.display()),
                help,
            },
            other => other,
        })?;
        debug!(path = %path.display(), tools = catalog.tools.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// A catalog whose entries take precedence over `self`.
    #[must_use]
    pub fn overlay(self, preferred: Self) -> Self {
        let mut tools = preferred.tools;
        tools.extend(self.tools);
        Self { tools }
    }

    /// Look up a tool by exact name. The first entry wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Effective tools, shadowed duplicates skipped, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        let mut seen = HashSet::new();
        self.tools
            .iter()
            .filter(move |tool| seen.insert(tool.name.clone()))
    }

    /// Effective tools carrying `label`.
    pub fn with_label(&self, label: Label) -> impl Iterator<Item = &Tool> {
        self.iter().filter(move |tool| tool.has_label(label))
    }

    /// Names of all effective tools, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.iter().map(|tool| tool.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of effective tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the catalog holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::configuration("Catalog entry with an empty name"));
    }
    if name.contains('@') {
        return Err(Error::configuration_with_help(
            format!("Invalid tool name '{name}'"),
            "Tool names cannot contain '@', it separates the version pin",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSource;

    const SAMPLE: &str = r#"
[[tools]]
name = "kind"
labels = ["k8s", "containers"]
source = { type = "github", repository = "kubernetes-sigs/kind" }

[[tools]]
name = "vault"
labels = ["security"]
target = "/usr/local/bin/vault"

[tools.source]
type = "hashicorp"

[[tools]]
name = "kind"
source = { type = "hashicorp" }
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names(), vec!["kind", "vault"]);

        let vault = catalog.get("vault").unwrap();
        assert_eq!(vault.source, ToolSource::HashiCorp { product: None });
        assert_eq!(
            vault.target.as_deref(),
            Some(Path::new("/usr/local/bin/vault"))
        );
    }

    #[test]
    fn test_first_match_wins() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        let kind = catalog.get("kind").unwrap();
        assert_eq!(kind.source.backend_type(), "github");
    }

    #[test]
    fn test_lookup_is_exact() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        assert!(catalog.get("kind@v0.22.0").is_none());
        assert!(catalog.get("KIND").is_none());
        assert!(catalog.get("unknown").is_none());
    }

    #[test]
    fn test_with_label() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        let k8s: Vec<_> = catalog.with_label(Label::K8s).map(|t| t.name.as_str()).collect();
        assert_eq!(k8s, vec!["kind"]);
        assert_eq!(catalog.with_label(Label::Iac).count(), 0);
    }

    #[test]
    fn test_overlay_prefers_user_entries() {
        let builtin = Catalog::from_toml_str(SAMPLE).unwrap();
        let user = Catalog::from_toml_str(
            r#"
[[tools]]
name = "vault"
source = { type = "github", repository = "hashicorp/vault" }
"#,
        )
        .unwrap();
        let merged = builtin.overlay(user);
        assert_eq!(merged.get("vault").unwrap().source.backend_type(), "github");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_rejects_pinned_name() {
        let err = Catalog::from_toml_str(
            r#"
[[tools]]
name = "kind@1.0"
source = { type = "hashicorp" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_rejects_unknown_source_type() {
        let err = Catalog::from_toml_str(
            r#"
[[tools]]
name = "jq"
source = { type = "nix", package = "jq" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load(&dir.path().join("catalog.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
