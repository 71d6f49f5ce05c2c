//! cdim relay configuration.
//!
//! TOML-based configuration with full validation. All sections use
//! sensible defaults so partial configs work out of the box.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{HistoryConfig, LogLevel, LoggingConfig, RelayConfig, ServerConfig};

use cdim_common::ConfigError;
use std::path::Path;

/// Load and validate config.
///
/// With `path`, the file must exist. Without it, `config.toml` is read from
/// the OS config directory and created with defaults when missing. If it
/// cannot be created, built-in defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &RelayConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = RelayConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"server\""));
        assert!(json.contains("\"history\""));
        assert!(json.contains("\"logging\""));
        assert!(json.contains("\"info\""));
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = RelayConfig::default();
        let json = config_to_json(&config);
        let parsed: RelayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.history.max_messages, 500);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[history]\nmax_messages = 10\nreplay_limit = 50\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_config_missing_explicit_path_fails() {
        let err = load_config(Some(Path::new("/tmp/cdim_missing_dir/config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let server = ServerConfig::default();
        assert_eq!(server.bind_addr(), "0.0.0.0:3000");
    }
}
