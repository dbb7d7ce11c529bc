//! Configuration validation rules.
//!
//! This module provides validation logic for `ClientConfig` values after
//! they have been loaded from environment, files, or defaults.

use crate::config::ClientConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl ClientConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `base_url` or `user_agent` is empty
    /// - `page_size` or `daily_limit` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid { field: "base_url".into(), reason: "must not be empty".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.page_size == 0 {
            return Err(ConfigError::Invalid { field: "page_size".into(), reason: "must be greater than 0".into() });
        }

        if self.daily_limit == 0 {
            return Err(ConfigError::Invalid { field: "daily_limit".into(), reason: "must be greater than 0".into() });
        }

        if self.cache_only && !self.cache_enabled {
            tracing::warn!("cache_only is set with caching disabled; every call will fail with a cache miss");
        }

        Ok(())
    }
}
