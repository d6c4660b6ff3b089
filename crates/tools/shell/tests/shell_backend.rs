//! Shell backend: version sources against a mock API and real `sh` runs.

use mercado_core::config::{HttpConfig, RetryConfig};
use mercado_core::tools::{
    InstallOptions, ReleaseBackend, Template, Tool, ToolSource, VersionSource,
};
use mercado_core::{Error, HttpSession, Platform};
use mercado_tools_shell::ShellBackend;
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session() -> HttpSession {
    HttpSession::new(&HttpConfig {
        retry: RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            backoff_multiplier: 2.0,
        },
        ..HttpConfig::default()
    })
    .unwrap()
}

fn scripted(latest: VersionSource, script: &str, env: &[(&str, &str)]) -> Tool {
    Tool::new(
        "hello",
        ToolSource::Shell {
            latest,
            script: Template::new(script),
            scripts: BTreeMap::new(),
            env: env
                .iter()
                .map(|(k, v)| ((*k).to_string(), Template::new(*v)))
                .collect(),
        },
    )
}

fn github_source() -> VersionSource {
    VersionSource::GitHub {
        repository: "acme/hello".into(),
    }
}

#[tokio::test]
async fn test_latest_from_github() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/hello/releases/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"tag_name": "v3.14.0", "assets": []})),
        )
        .mount(&server)
        .await;

    let backend = ShellBackend::new(&session()).with_github_api_base(server.uri());
    let tool = scripted(github_source(), "true", &[]);
    assert_eq!(backend.latest_version(&tool).await.unwrap(), "v3.14.0");
}

#[tokio::test]
async fn test_latest_from_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3\n"))
        .mount(&server)
        .await;

    let backend = ShellBackend::new(&session());
    let tool = scripted(
        VersionSource::Url {
            url: format!("{}/stable.txt", server.uri()),
        },
        "true",
        &[],
    );
    assert_eq!(backend.latest_version(&tool).await.unwrap(), "1.2.3");

    let release = backend
        .release(&tool, "v1.2.3", &Platform::new("linux", "amd64"))
        .await
        .unwrap();
    assert_eq!(release.version, "v1.2.3");
    assert!(release.url.is_none());
}

#[tokio::test]
async fn test_url_source_rejects_unpublished_pins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3\n"))
        .mount(&server)
        .await;

    let backend = ShellBackend::new(&session());
    let tool = scripted(
        VersionSource::Url {
            url: format!("{}/stable.txt", server.uri()),
        },
        "true",
        &[],
    );
    for pin in ["0.0.1", "invalid"] {
        let err = backend
            .release(&tool, pin, &Platform::new("linux", "amd64"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VersionNotFound { .. }), "{pin}: {err}");
    }
}

#[tokio::test]
async fn test_pinned_version_is_validated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/hello/releases/tags/v9.9.9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let backend = ShellBackend::new(&session()).with_github_api_base(server.uri());
    let tool = scripted(github_source(), "true", &[]);
    let err = backend
        .release(&tool, "v9.9.9", &Platform::new("linux", "amd64"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VersionNotFound { .. }));
}

fn release(version: &str) -> mercado_core::tools::Release {
    mercado_core::tools::Release {
        tool: "hello".into(),
        version: version.into(),
        platform: Platform::new("linux", "amd64"),
        url: None,
    }
}

#[tokio::test]
async fn test_script_installs_into_install_dir() {
    let dir = tempfile::tempdir().unwrap();
    let tool = scripted(
        github_source(),
        "printf '#!/bin/sh\\necho {name} {version}\\n' > \"$DEST/{name}\"\nchmod +x \"$DEST/{name}\"",
        &[("DEST", "{install_dir}")],
    );

    let backend = ShellBackend::new(&session());
    let installer = backend
        .installer(&tool, release("1.4.2"), &InstallOptions::new(dir.path()))
        .unwrap();
    installer.install().await.unwrap();

    let installed = std::fs::read_to_string(dir.path().join("hello")).unwrap();
    assert!(installed.contains("echo hello 1.4.2"));
    assert_eq!(installer.destination(), dir.path().join("hello"));
}

#[tokio::test]
async fn test_environment_is_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let tool = scripted(
        github_source(),
        "test -z \"${HOME:-}\"\ntest -n \"$PATH\"\ntouch \"$DEST/ok\"",
        &[("DEST", "{install_dir}")],
    );

    let backend = ShellBackend::new(&session());
    let installer = backend
        .installer(&tool, release("1.0.0"), &InstallOptions::new(dir.path()))
        .unwrap();
    installer.install().await.unwrap();
    assert!(dir.path().join("ok").exists());
}

#[tokio::test]
async fn test_script_failure_stops_and_reports_status() {
    let dir = tempfile::tempdir().unwrap();
    let tool = scripted(
        github_source(),
        "false\ntouch \"$DEST/reached\"",
        &[("DEST", "{install_dir}")],
    );

    let backend = ShellBackend::new(&session());
    let installer = backend
        .installer(&tool, release("1.0.0"), &InstallOptions::new(dir.path()))
        .unwrap();
    let err = installer.install().await.unwrap_err();

    match err {
        Error::Installation { message, .. } => assert!(message.contains('1'), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("reached").exists());
}

#[tokio::test]
async fn test_non_zero_exit_status_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let tool = scripted(github_source(), "echo boom >&2\nexit 7", &[]);

    let backend = ShellBackend::new(&session());
    let installer = backend
        .installer(&tool, release("1.0.0"), &InstallOptions::new(dir.path()))
        .unwrap();
    let err = installer.install().await.unwrap_err();

    match err {
        Error::Installation { message, .. } => {
            assert!(message.contains('7'), "{message}");
            assert!(message.contains("boom"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
