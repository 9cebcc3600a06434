//! Site configuration.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings describing the site the jobs run for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// IANA timezone name used for local-midnight schedules.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl SiteConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz, AppError> {
        self.timezone.parse::<Tz>().map_err(|e| {
            AppError::configuration(format!("Invalid site timezone '{}': {e}", self.timezone))
        })
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}
