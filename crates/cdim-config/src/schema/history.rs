use serde::{Deserialize, Serialize};

/// Per-pair message history limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Messages retained per pair; oldest are evicted first.
    pub max_messages: u32,
    /// Most recent messages replayed to a joining participant.
    pub replay_limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 500,
            replay_limit: 100,
        }
    }
}
