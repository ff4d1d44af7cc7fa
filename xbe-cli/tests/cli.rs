//! Integration tests for the `xbe` binary.
//!
//! Each test runs the binary with an isolated HOME and config directory and
//! with the token environment variables cleared.

use std::process::{Command, Output};

use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn xbe(home: &TempDir, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_xbe"));
    command
        .args(args)
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("XBE_TOKEN")
        .env_remove("XBE_API_TOKEN")
        .env_remove("XBE_BASE_URL")
        .env_remove("RUST_LOG");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().unwrap()
}

/// A local URL nothing is listening on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port())
}

#[test]
fn test_status_reports_env_token_source() {
    let home = TempDir::new().unwrap();
    let output = xbe(
        &home,
        &["--base-url", "staging", "auth", "status"],
        &[("XBE_TOKEN", "tok_abcdef123456")],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("https://staging.x-b-e.com"));
    assert!(stdout.contains("XBE_TOKEN"));
    assert!(stdout.contains("tok_…3456"));
    assert!(!stdout.contains("tok_abcdef123456"));
}

#[test]
fn test_status_flag_beats_env() {
    let home = TempDir::new().unwrap();
    let output = xbe(
        &home,
        &["auth", "status", "--token", "tok_from_flag_0001"],
        &[("XBE_TOKEN", "tok_from_env_0002")],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("flag"));
    assert!(stdout.contains("0001"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_without_token_sends_unauthenticated_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/widgets"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let base_url = mock_server.uri();
    let output = tokio::task::spawn_blocking(move || {
        xbe(&home, &["--base-url", &base_url, "api", "get", "/v1/widgets"], &[])
    })
    .await
    .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Authentication required"), "stderr: {}", stderr);

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_without_token_reads_public_resource() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"type": "widgets", "id": "7", "attributes": {"name": "Cog"}}]
        })))
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let base_url = mock_server.uri();
    let output = tokio::task::spawn_blocking(move || {
        xbe(&home, &["--base-url", &base_url, "api", "get", "/v1/widgets", "--ids"], &[])
    })
    .await
    .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "widgets\t7\tCog");
}

#[test]
fn test_api_without_token_reports_transport_error() {
    let home = TempDir::new().unwrap();
    let base_url = closed_port_url();
    let output = xbe(&home, &["--base-url", &base_url, "api", "get", "/v1/widgets"], &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("transport error"), "stderr: {}", stderr);
    assert!(!stderr.contains("Authentication required"), "stderr: {}", stderr);
}

#[test]
fn test_huge_timeout_does_not_panic() {
    let home = TempDir::new().unwrap();
    let base_url = closed_port_url();
    let output = xbe(
        &home,
        &["--base-url", &base_url, "--timeout", "18446744073709551615", "--no-auth", "api", "get", "/x"],
        &[],
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked"), "stderr: {}", stderr);
    assert!(stderr.contains("transport error"), "stderr: {}", stderr);
}

#[test]
fn test_api_connection_failure_is_reported() {
    let home = TempDir::new().unwrap();
    let base_url = closed_port_url();
    let output = xbe(
        &home,
        &["--base-url", &base_url, "--no-auth", "api", "get", "/v1/widgets"],
        &[],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("transport error"), "stderr: {}", stderr);
}

#[test]
fn test_malformed_filter_is_rejected() {
    let home = TempDir::new().unwrap();
    let base_url = closed_port_url();
    let output = xbe(
        &home,
        &["--base-url", &base_url, "--no-auth", "api", "get", "/v1/widgets", "--filter", "broker"],
        &[],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--filter expects KEY=VALUE"), "stderr: {}", stderr);
}
