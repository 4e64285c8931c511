//! Integration tests for CLI commands

use std::path::Path;
use std::process::{Command, Output};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

/// Helper to run vpmdex command
fn vpmdex(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vpmdex"))
        .args(args)
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute vpmdex")
}

fn write_index(dir: &Path) -> String {
    let index = json!({
        "packages": {
            "com.example.pkg": {"versions": {
                "1.0.0": {"name": "com.example.pkg", "version": "1.0.0", "zipSHA256": HELLO_SHA256},
                "1.10.0": {"name": "com.example.pkg", "version": "1.10.0"},
                "1.2.0": {"name": "com.example.pkg", "version": "1.2.0", "zipSHA256": HELLO_SHA256}
            }}
        },
        "author": "Example",
        "name": "Example Listing",
        "url": "https://example.com/index.json"
    });
    let path = dir.join("index.json");
    std::fs::write(&path, serde_json::to_string_pretty(&index).unwrap()).unwrap();
    path.to_string_lossy().into_owned()
}

mod list_command {
    use super::*;

    #[test]
    fn test_list_sorts_versions() {
        let dir = tempfile::tempdir().unwrap();
        let index = write_index(dir.path());

        let output = vpmdex(&["list", &index]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Example Listing"));
        assert!(stdout.contains("3 versions"));
        assert!(stdout.contains("no checksum"));

        let newest = stdout.find("1.10.0").unwrap();
        let middle = stdout.find("1.2.0").unwrap();
        let oldest = stdout.find("1.0.0").unwrap();
        assert!(newest < middle && middle < oldest);
    }

    #[test]
    fn test_list_json() {
        let dir = tempfile::tempdir().unwrap();
        let index = write_index(dir.path());

        let output = vpmdex(&["list", &index, "--json"]);
        assert!(output.status.success());

        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
        assert_eq!(json[0]["name"], "com.example.pkg");
        assert_eq!(json[0]["latest"], "1.10.0");
        assert_eq!(json[0]["versions"][2]["zipSHA256"], HELLO_SHA256);
    }

    #[test]
    fn test_list_missing_file() {
        let output = vpmdex(&["list", "/nonexistent/index.json"]);
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_list_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{ not json").unwrap();

        let output = vpmdex(&["list", &path.to_string_lossy()]);
        assert_eq!(output.status.code(), Some(2));
    }
}

mod generate_command {
    use super::*;

    async fn mock_provider(server: &MockServer, digest: &str) {
        Mock::given(method("GET"))
            .and(path("/repos/owner/repo/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "name": "Version 1.0.0",
                    "tag_name": "1.0.0",
                    "html_url": "https://github.com/owner/repo/releases/tag/1.0.0",
                    "draft": false,
                    "prerelease": false,
                    "assets": [
                        {"name": "package.json",
                         "browser_download_url": format!("{}/dl/package.json", server.uri())},
                        {"name": "com.example.pkg-1.0.0.zip",
                         "browser_download_url": format!("{}/dl/com.example.pkg-1.0.0.zip", server.uri()),
                         "digest": format!("sha256:{}", digest)}
                    ]
                }
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dl/package.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "com.example.pkg",
                "version": "1.0.0",
                "displayName": "Example Package"
            })))
            .mount(server)
            .await;
    }

    fn generate(server: &MockServer, output: &Path) -> Output {
        vpmdex(&[
            "generate",
            "--repository",
            "owner/repo",
            "--package",
            "com.example.pkg",
            "--api-url",
            &server.uri(),
            "--output",
            &output.to_string_lossy(),
            "--repo-url",
            "https://example.com/index.json",
            "--repo-author",
            "Example",
            "--repo-name",
            "Example Listing",
        ])
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_generate_writes_index() {
        let server = MockServer::start().await;
        mock_provider(&server, HELLO_SHA256).await;
        let dir = tempfile::tempdir().unwrap();

        let output = generate(&server, dir.path());
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(String::from_utf8_lossy(&output.stdout).contains("1 added"));

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("index.json")).unwrap(),
        )
        .unwrap();
        let version = &written["packages"]["com.example.pkg"]["versions"]["1.0.0"];
        assert_eq!(version["zipSHA256"], HELLO_SHA256);
        assert_eq!(version["displayName"], "Example Package");
        assert_eq!(
            version["changelogUrl"],
            "https://github.com/owner/repo/releases/tag/1.0.0"
        );
        assert!(!dir.path().join("index.prerelease.json").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_generate_checksum_conflict() {
        let server = MockServer::start().await;
        let other = "1".repeat(64);
        mock_provider(&server, &other).await;

        let dir = tempfile::tempdir().unwrap();
        let index = write_index(dir.path());
        let before = std::fs::read(&index).unwrap();

        let output = generate(&server, dir.path());
        assert_eq!(output.status.code(), Some(4));
        assert_eq!(std::fs::read(&index).unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_generate_listing_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let output = generate(&server, dir.path());
        assert_eq!(output.status.code(), Some(3));
        assert!(!dir.path().join("index.json").exists());
    }

    #[test]
    fn test_generate_without_repository() {
        let dir = tempfile::tempdir().unwrap();
        let output = vpmdex(&["generate", "--output", &dir.path().to_string_lossy()]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_generate_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("vpmdex.yaml");
        std::fs::write(
            &config,
            "repository: owner/repo\npackage: com.example.pkg\nstable:\n  url: not a url\n",
        )
        .unwrap();

        let output = vpmdex(&["generate", "--config", &config.to_string_lossy()]);
        assert_eq!(output.status.code(), Some(2));
    }
}

#[test]
fn test_unknown_command_is_usage_error() {
    let output = vpmdex(&["publish"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn test_help() {
    let output = vpmdex(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("generate"));
    assert!(stdout.contains("list"));
}
