//! End-to-end: install from a mock download host, then probe, compare and
//! uninstall through the binary.

#![allow(deprecated)] // cargo_bin is deprecated but the replacement requires macros

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOOL: &str = "mercado-hello";
const LATEST: &str = "1.4.2";

fn write_home(home: &Path, server: &MockServer) {
    let catalog = home.join("catalog.toml");
    fs::write(
        &catalog,
        format!(
            r#"
[[tools]]
name = "{TOOL}"

[tools.source]
type = "url"
latest_version_url = "{uri}/hello/stable.txt"
url = "{uri}/hello/{{version}}/{{os}}/{{arch}}/hello"
"#,
            uri = server.uri()
        ),
    )
    .unwrap();
    fs::write(
        home.join("config.toml"),
        format!(
            "catalog = {:?}\n\n[http.retry]\nmax_attempts = 2\ninitial_backoff_ms = 1\nmax_backoff_ms = 2\n",
            catalog.display().to_string()
        ),
    )
    .unwrap();
}

async fn mount_release(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/hello/stable.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{LATEST}\n")))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/hello/1\.4\.2/[^/]+/[^/]+/hello$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/hello/1\.4\.2/[^/]+/[^/]+/hello$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("#!/bin/sh\necho \"{TOOL} version {LATEST}\"\n")),
        )
        .mount(server)
        .await;
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(home: &Path, args: &[&str]) -> std::process::Output {
    let home = home.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("mercado")
            .unwrap()
            .env("MERCADO_CONFIG", home.join("config.toml"))
            .env("MERCADO_INSTALL_DIR", home.join("bin"))
            .env_remove("RUST_LOG")
            .args(&args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_install_then_probe_reports_latest() {
    let server = MockServer::start().await;
    mount_release(&server).await;
    let home = TempDir::new().unwrap();
    write_home(home.path(), &server);

    let latest = run(home.path(), &["latest", TOOL]).await;
    assert!(latest.status.success(), "{latest:?}");
    assert_eq!(stdout(&latest).trim(), LATEST);

    let installed = run(home.path(), &["install", TOOL]).await;
    assert!(installed.status.success(), "{installed:?}");
    assert!(stdout(&installed).contains(&format!("Installed {TOOL} {LATEST}")));
    assert!(home.path().join("bin").join(TOOL).exists());

    let version = run(home.path(), &["version", TOOL]).await;
    assert!(version.status.success(), "{version:?}");
    assert_eq!(stdout(&version).trim(), LATEST);

    let outdated = run(home.path(), &["outdated", TOOL]).await;
    assert!(outdated.status.success(), "{outdated:?}");
    assert!(stdout(&outdated).contains("(up to date)"));

    let removed = run(home.path(), &["uninstall", TOOL]).await;
    assert!(removed.status.success(), "{removed:?}");
    assert!(!home.path().join("bin").join(TOOL).exists());

    let gone = run(home.path(), &["version", TOOL]).await;
    assert_eq!(gone.status.code(), Some(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dry_run_installs_nothing() {
    let server = MockServer::start().await;
    mount_release(&server).await;
    let home = TempDir::new().unwrap();
    write_home(home.path(), &server);

    let output = run(home.path(), &["install", &format!("{TOOL}@{LATEST}"), "--dry-run"]).await;
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).starts_with(&format!("Would install {TOOL} {LATEST}")));
    assert!(!home.path().join("bin").join(TOOL).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_version_fails() {
    let server = MockServer::start().await;
    mount_release(&server).await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    write_home(home.path(), &server);

    let output = run(home.path(), &["install", &format!("{TOOL}@0.0.0")]).await;
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no available artifact"));
}
