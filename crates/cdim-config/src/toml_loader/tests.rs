//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_cdim_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, cdim_common::ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 8088

[history]
replay_limit = 20
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 8088);
    assert_eq!(config.history.replay_limit, 20);
    // Defaults preserved
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.history.max_messages, 500);
    assert_eq!(config.server.outbox_capacity, 256);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, cdim_common::ConfigError::ParseError(_)));
}

#[test]
fn load_wrong_type_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nport = \"eighty\"\n").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, cdim_common::ConfigError::ParseError(_)));
}

#[test]
fn load_log_level() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.logging.level, crate::schema::LogLevel::Debug);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cdim").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.history.max_messages, 500);
    assert_eq!(config.history.replay_limit, 100);
}

#[test]
fn load_or_create_writes_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cdim").join("config.toml");

    let config = load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.server.port, 3000);
}

#[test]
fn load_or_create_reads_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nport = 4100\n").unwrap();

    let config = load_or_create(&path).unwrap();
    assert_eq!(config.server.port, 4100);
}

#[test]
fn unwritable_config_dir_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    // A plain file where the config directory should be.
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "").unwrap();
    let path = blocker.join("cdim").join("config.toml");

    assert!(create_default_config(&path).is_err());

    let config = load_or_create(&path).unwrap();
    assert!(!path.exists());
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.history.max_messages, 500);
}

#[test]
fn load_or_create_keeps_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server\n").unwrap();

    let err = load_or_create(&path).unwrap_err();
    assert!(matches!(err, cdim_common::ConfigError::ParseError(_)));
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::RelayConfig;

    let content = default_config_toml();
    let config: RelayConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.server.port, 3000);
}

#[test]
fn default_config_path_is_reasonable() {
    // This may not work in all CI environments, but should work locally
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("cdim"));
        assert!(path_str.ends_with("config.toml"));
    }
}
