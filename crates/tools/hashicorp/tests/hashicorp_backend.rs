//! HashiCorp backend against a mock releases API.

use mercado_core::config::{HttpConfig, RetryConfig};
use mercado_core::tools::{ReleaseBackend, Tool, ToolSource};
use mercado_core::{Error, HttpSession, Platform};
use mercado_tools_hashicorp::HashiCorpBackend;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session() -> HttpSession {
    HttpSession::new(&HttpConfig {
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            backoff_multiplier: 2.0,
        },
        ..HttpConfig::default()
    })
    .unwrap()
}

fn terraform() -> Tool {
    Tool::new("terraform", ToolSource::HashiCorp { product: None })
}

fn release(version: &str) -> serde_json::Value {
    let build = |os: &str, arch: &str| {
        json!({
            "os": os,
            "arch": arch,
            "url": format!("https://releases.example.com/terraform/{version}/terraform_{version}_{os}_{arch}.zip"),
        })
    };
    json!({
        "version": version,
        "builds": [
            build("darwin", "amd64"),
            build("darwin", "arm64"),
            build("linux", "amd64"),
            build("linux", "arm64"),
        ],
    })
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/releases/terraform"))
        .and(query_param("license_class", "oss"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([release("1.7.5"), release("1.7.4")])),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_latest_version_is_newest() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let backend = HashiCorpBackend::new(&session()).with_api_base(server.uri());
    assert_eq!(backend.latest_version(&terraform()).await.unwrap(), "1.7.5");
}

#[tokio::test]
async fn test_latest_then_pinned_is_identical() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/releases/terraform/1.7.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release("1.7.5")))
        .mount(&server)
        .await;

    let backend = HashiCorpBackend::new(&session()).with_api_base(server.uri());
    let platform = Platform::new("darwin", "arm64");
    let latest = backend.latest_release(&terraform(), &platform).await.unwrap();
    let pinned = backend
        .release(&terraform(), "1.7.5", &platform)
        .await
        .unwrap();
    assert_eq!(latest, pinned);
    assert!(latest.url.unwrap().ends_with("terraform_1.7.5_darwin_arm64.zip"));
}

#[tokio::test]
async fn test_unknown_product() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/releases/terraform"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let backend = HashiCorpBackend::new(&session()).with_api_base(server.uri());
    let err = backend.latest_version(&terraform()).await.unwrap_err();
    assert!(matches!(err, Error::ToolNotFound { .. }));
}

#[tokio::test]
async fn test_empty_listing_is_tool_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/releases/terraform"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = HashiCorpBackend::new(&session()).with_api_base(server.uri());
    let err = backend.latest_version(&terraform()).await.unwrap_err();
    assert!(matches!(err, Error::ToolNotFound { .. }));
}

#[tokio::test]
async fn test_unknown_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/releases/terraform/0.0.0"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let backend = HashiCorpBackend::new(&session()).with_api_base(server.uri());
    let err = backend
        .release(&terraform(), "0.0.0", &Platform::new("linux", "amd64"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VersionNotFound { .. }));
}

#[tokio::test]
async fn test_no_build_for_platform() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/releases/terraform/1.7.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release("1.7.5")))
        .mount(&server)
        .await;

    let backend = HashiCorpBackend::new(&session()).with_api_base(server.uri());
    let err = backend
        .release(&terraform(), "1.7.5", &Platform::new("windows", "amd64"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoArtifactForPlatform { .. }));
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/releases/terraform"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_listing(&server).await;

    let backend = HashiCorpBackend::new(&session()).with_api_base(server.uri());
    assert_eq!(backend.latest_version(&terraform()).await.unwrap(), "1.7.5");
}
