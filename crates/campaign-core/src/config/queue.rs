//! Reference task queue configuration.

use serde::{Deserialize, Serialize};

/// Settings for the in-memory task queue backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of completed/failed/canceled records retained.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> usize {
    10_000
}
