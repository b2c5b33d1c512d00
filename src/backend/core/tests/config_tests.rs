//! Configuration file loading tests.
//!
//! Tests cover:
//! - TOML and YAML files
//! - Duration parsing
//! - Rejection of unusable settings

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use waypoint_core::config::Config;
use waypoint_core::error::ErrorCode;
use waypoint_core::telemetry::LogFormat;

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// File Formats
// ============================================================================

#[test]
fn test_load_toml_file() {
    let file = config_file(
        ".toml",
        r#"
environment = "staging"

[server]
host = "127.0.0.1"
port = 9090

[database]
url = "postgres://waypoint@localhost/waypoint"
max_connections = 5

[distance]
api_key = "toml-key"
request_timeout = "3s"

[jobs]
max_concurrent = 4
max_outstanding = 100
provider_timeout = "1500ms"

[logging]
level = "debug"
format = "compact"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.environment, "staging");
    assert_eq!(config.bind_address(), "127.0.0.1:9090");
    let database = config.database.unwrap();
    assert_eq!(database.url, "postgres://waypoint@localhost/waypoint");
    assert_eq!(database.max_connections, 5);
    assert_eq!(config.distance.api_key.as_deref(), Some("toml-key"));
    assert_eq!(config.distance.request_timeout, Duration::from_secs(3));
    assert_eq!(config.jobs.max_concurrent, 4);
    assert_eq!(config.jobs.max_outstanding, 100);
    assert_eq!(config.jobs.provider_timeout, Duration::from_millis(1500));
    assert_eq!(config.jobs.shutdown_timeout, Duration::from_secs(30));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
fn test_load_yaml_file() {
    let file = config_file(
        ".yaml",
        r#"
server:
  port: 7070
database:
  url: "postgres://localhost/routes"
distance:
  api_key: "yaml-key"
  language: "de"
jobs:
  shutdown_timeout: "1m"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.port, 7070);
    assert_eq!(config.distance.api_key.as_deref(), Some("yaml-key"));
    assert_eq!(config.distance.language, "de");
    assert_eq!(config.jobs.shutdown_timeout, Duration::from_secs(60));
    assert_eq!(config.jobs.max_concurrent, 64);
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_zero_outstanding_is_rejected() {
    let file = config_file(
        ".toml",
        r#"
[jobs]
max_outstanding = 0
"#,
    );

    let err = Config::from_file(file.path()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigurationError);
}

#[test]
fn test_unparseable_duration_is_rejected() {
    let file = config_file(
        ".toml",
        r#"
[jobs]
provider_timeout = "soon"
"#,
    );

    let err = Config::from_file(file.path()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigurationError);
}

#[test]
fn test_missing_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigurationError);
}
