//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every section falls back to its defaults when absent.

pub mod jobs;
pub mod logging;
pub mod queue;
pub mod site;
pub mod worker;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::jobs::JobsConfig;
pub use self::logging::LoggingConfig;
pub use self::queue::QueueConfig;
pub use self::site::SiteConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (default.toml + environment overlay + `CAMPAIGN__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Job orchestration settings.
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Reference task queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Site settings (timezone).
    #[serde(default)]
    pub site: SiteConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the `config/` directory.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and environment
    /// variables prefixed with `CAMPAIGN__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from(Path::new("config"), env)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from(dir: &Path, env: &str) -> Result<Self, AppError> {
        let default_path = dir.join("default");
        let env_path = dir.join(env);

        let config = config::Config::builder()
            .add_source(config::File::with_name(&default_path.to_string_lossy()).required(false))
            .add_source(config::File::with_name(&env_path.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix("CAMPAIGN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject settings that would make the job layer misbehave.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jobs.failure_threshold == 0 {
            return Err(AppError::configuration(
                "jobs.failure_threshold must be at least 1",
            ));
        }
        if self.jobs.default_batch_size == 0 {
            return Err(AppError::configuration(
                "jobs.default_batch_size must be at least 1",
            ));
        }
        check_seconds(
            "jobs.failure_window_seconds",
            self.jobs.failure_window_seconds,
        )?;
        check_seconds(
            "jobs.midnight_check_interval_seconds",
            self.jobs.midnight_check_interval_seconds,
        )?;
        if self.worker.concurrency == 0 {
            return Err(AppError::configuration(
                "worker.concurrency must be at least 1",
            ));
        }
        self.site.tz()?;
        Ok(())
    }
}

/// A positive number of seconds that fits in a `chrono::Duration`.
fn check_seconds(key: &str, seconds: i64) -> Result<(), AppError> {
    if seconds <= 0 || chrono::Duration::try_seconds(seconds).is_none() {
        return Err(AppError::configuration(format!(
            "{key} must be a positive number of seconds, got {seconds}"
        )));
    }
    Ok(())
}
