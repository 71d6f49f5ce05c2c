//! Full configuration validation.
//!
//! Each check pushes a message into a shared list; the orchestrator
//! collects them into a single `ConfigError`.

mod helpers;


use crate::schema::RelayConfig;
use cdim_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_history(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &RelayConfig) {
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    validate_range(errors, "server.port", u32::from(config.server.port), 1, 65535);
    validate_range(
        errors,
        "server.outbox_capacity",
        config.server.outbox_capacity,
        1,
        65536,
    );
}

fn validate_history(errors: &mut Vec<String>, config: &RelayConfig) {
    validate_range(
        errors,
        "history.max_messages",
        config.history.max_messages,
        1,
        100_000,
    );
    // Replay can never exceed what is retained.
    validate_range(
        errors,
        "history.replay_limit",
        config.history.replay_limit,
        0,
        config.history.max_messages,
    );
}
