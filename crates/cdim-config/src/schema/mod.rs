//! Configuration schema types for the relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod history;
mod logging;
mod server;

pub use history::*;
pub use logging::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}
