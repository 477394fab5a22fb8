//! Unit tests for configuration loading and graceful degradation
//!
//! Tests that manipulate NUTRISCAN_BACKEND_URL are marked with #[serial]
//! so they never race each other on the process environment.

use nutriscan_common::config::{
    resolve_backend_url, TomlConfig, BACKEND_URL_ENV, DEFAULT_RESET_DELAY_MS,
};
use nutriscan_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let config = TomlConfig::load_or_default(Some(&missing)).unwrap();

    assert!(config.backend_url.is_none());
    assert_eq!(config.scanner.reset_delay_ms, DEFAULT_RESET_DELAY_MS);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_full_file_is_loaded() {
    let file = write_config(
        r#"
        backend_url = "http://catalog.local:8000/"

        [scanner]
        reset_delay_ms = 3000
        request_timeout_ms = 10000

        [logging]
        level = "debug"
        file = "/tmp/nutriscan.log"
        "#,
    );

    let config = TomlConfig::load_or_default(Some(file.path())).unwrap();

    assert_eq!(config.backend_url.as_deref(), Some("http://catalog.local:8000/"));
    assert_eq!(config.scanner.reset_delay_ms, 3000);
    assert_eq!(config.scanner.request_timeout_ms, 10000);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.file.as_deref(),
        Some(std::path::Path::new("/tmp/nutriscan.log"))
    );
}

#[test]
fn test_malformed_file_is_reported() {
    let file = write_config("backend_url = [not valid");

    let result = TomlConfig::load_or_default(Some(file.path()));

    assert!(matches!(result, Err(Error::Toml(_))));
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(BACKEND_URL_ENV, "env-host:8000");
    let config = TomlConfig {
        backend_url: Some("http://toml-host".to_string()),
        ..Default::default()
    };

    let url = resolve_backend_url(None, BACKEND_URL_ENV, &config).unwrap();
    env::remove_var(BACKEND_URL_ENV);

    assert_eq!(url, "http://env-host:8000");
}

#[test]
#[serial]
fn test_toml_used_when_env_blank() {
    env::set_var(BACKEND_URL_ENV, "   ");
    let config = TomlConfig {
        backend_url: Some("https://toml-host/".to_string()),
        ..Default::default()
    };

    let url = resolve_backend_url(None, BACKEND_URL_ENV, &config).unwrap();
    env::remove_var(BACKEND_URL_ENV);

    assert_eq!(url, "https://toml-host");
}

#[test]
#[serial]
fn test_missing_backend_url_is_config_error() {
    env::remove_var(BACKEND_URL_ENV);

    let result = resolve_backend_url(Some(""), BACKEND_URL_ENV, &TomlConfig::default());

    match result {
        Err(Error::Config(msg)) => assert_eq!(msg, "Backend URL is missing"),
        other => panic!("expected config error, got {:?}", other),
    }
}
