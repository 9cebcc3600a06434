//! Job orchestration configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Failed item executions within the window that trip the circuit breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,
    /// Trailing window, in seconds, over which failures are counted.
    #[serde(default = "default_failure_window")]
    pub failure_window_seconds: i64,
    /// Batch size for batched jobs that do not override it.
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,
    /// How often the midnight schedule self-check runs, in seconds.
    #[serde(default = "default_midnight_check_interval")]
    pub midnight_check_interval_seconds: i64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            failure_window_seconds: default_failure_window(),
            default_batch_size: default_batch_size(),
            midnight_check_interval_seconds: default_midnight_check_interval(),
        }
    }
}

fn default_failure_threshold() -> usize {
    5
}

fn default_failure_window() -> i64 {
    3600
}

fn default_batch_size() -> usize {
    15
}

fn default_midnight_check_interval() -> i64 {
    6 * 3600
}
