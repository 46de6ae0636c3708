//! Configuration loading and graceful degradation
//!
//! Uses serial_test to prevent races on INTEGRITY_API_URL.
//! Tests that touch the environment are marked #[serial].

use integrity_common::config::{write_toml_config, LoggingConfig, TomlConfig, API_URL_ENV};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_partial_file_fills_defaults() {
    let toml_str = r#"
        api_base_url = "http://10.0.0.5:8000"
        [logging]
        level = "debug"
    "#;

    let config: TomlConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.api_base_url, "http://10.0.0.5:8000");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.refresh_interval_secs, 30);
    assert_eq!(config.diagnostics_batch_size, 10);
    assert_eq!(config.chat_history_limit, 20);
    assert!(config.export_dir.is_none());
}

#[test]
fn test_empty_file_is_default() {
    let config: TomlConfig = toml::from_str("").unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_write_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = TomlConfig {
        api_base_url: "https://integrity.example.kz".to_string(),
        refresh_interval_secs: 60,
        diagnostics_batch_size: 4,
        export_dir: Some(PathBuf::from("/tmp/reports")),
        logging: LoggingConfig {
            level: "warn".to_string(),
            file: None,
        },
        ..Default::default()
    };

    write_toml_config(&config, &path).unwrap();
    let loaded = TomlConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = TomlConfig::load_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "refresh_interval_secs = \"soon\"").unwrap();

    assert!(TomlConfig::load(&path).is_err());
    let config = TomlConfig::load_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_load_rejects_zero_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "refresh_interval_secs = 0").unwrap();

    assert!(TomlConfig::load(&path).is_err());
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    env::set_var(API_URL_ENV, "http://from-env:8000");

    let mut config = TomlConfig::default();
    config.resolve_api_base_url(Some("http://from-cli:9000/"));
    assert_eq!(config.api_base_url, "http://from-cli:9000");

    env::remove_var(API_URL_ENV);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    env::set_var(API_URL_ENV, "http://from-env:8000");

    let mut config: TomlConfig = toml::from_str(r#"api_base_url = "http://from-file:8000""#).unwrap();
    config.resolve_api_base_url(None);
    assert_eq!(config.api_base_url, "http://from-env:8000");

    env::remove_var(API_URL_ENV);
}

#[test]
#[serial]
fn test_file_value_kept_without_overrides() {
    env::remove_var(API_URL_ENV);

    let mut config: TomlConfig = toml::from_str(r#"api_base_url = "http://from-file:8000""#).unwrap();
    config.resolve_api_base_url(None);
    assert_eq!(config.api_base_url, "http://from-file:8000");
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    env::set_var(API_URL_ENV, "   ");

    let mut config = TomlConfig::default();
    config.resolve_api_base_url(None);
    assert_eq!(config.api_base_url, "http://localhost:8000");

    env::remove_var(API_URL_ENV);
}
