//! The built-in catalog and user overlays.

use mercado_core::{Catalog, Result, Settings};

/// Built-in catalog shipped with the binary.
pub const BUILTIN_CATALOG: &str = include_str!("../catalog.toml");

/// Parse the built-in catalog.
///
/// # Errors
///
/// Returns a configuration error if the embedded TOML is invalid.
pub fn builtin() -> Result<Catalog> {
    Catalog::from_toml_str(BUILTIN_CATALOG)
}

/// The built-in catalog with the user's catalog, if configured, on top.
///
/// # Errors
///
/// Returns an error if either catalog cannot be read or parsed.
pub fn load(settings: &Settings) -> Result<Catalog> {
    let catalog = builtin()?;
    match &settings.catalog {
        Some(path) => Ok(catalog.overlay(Catalog::load(path)?)),
        None => Ok(catalog),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercado_core::tools::{Label, ToolSource};

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = builtin().unwrap();
        assert_eq!(
            catalog.names(),
            vec![
                "cosign",
                "gh",
                "helm",
                "k3d",
                "kind",
                "kubectl",
                "minikube",
                "packer",
                "terraform",
                "terragrunt",
                "tfsec",
                "trivy",
                "vagrant",
                "vault",
                "waypoint",
            ]
        );
    }

    #[test]
    fn test_builtin_sources() {
        let catalog = builtin().unwrap();
        assert_eq!(catalog.get("kind").unwrap().source.backend_type(), "github");
        assert_eq!(
            catalog.get("terraform").unwrap().source.backend_type(),
            "hashicorp"
        );
        assert_eq!(catalog.get("kubectl").unwrap().source.backend_type(), "url");

        match &catalog.get("helm").unwrap().source {
            ToolSource::Shell { script, env, .. } => {
                assert!(script.as_str().contains("--version {version}"));
                assert_eq!(env["USE_SUDO"].as_str(), "false");
                assert_eq!(env["HELM_INSTALL_DIR"].as_str(), "{install_dir}");
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_builtin_labels() {
        let catalog = builtin().unwrap();
        let iac: Vec<_> = catalog
            .with_label(Label::Iac)
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(iac, vec!["terragrunt", "terraform"]);
    }

    #[test]
    fn test_user_catalog_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[[tools]]
name = "kind"
source = { type = "github", repository = "example/kind-fork" }

[[tools]]
name = "stern"
labels = ["k8s"]
source = { type = "github", repository = "stern/stern" }
"#,
        )
        .unwrap();

        let settings = Settings {
            catalog: Some(path),
            ..Settings::default()
        };
        let catalog = load(&settings).unwrap();
        assert_eq!(catalog.len(), 16);
        match &catalog.get("kind").unwrap().source {
            ToolSource::GitHub { repository, .. } => assert_eq!(repository, "example/kind-fork"),
            other => panic!("unexpected source: {other:?}"),
        }
    }
}
