//! Client configuration with layered loading.
//!
//! This module provides configuration management using figment for
//! layered loading from multiple sources:
//!
//! 1. Environment variables (RASPLET_*)
//! 2. TOML config file (if RASPLET_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Environment reading happens only in [`ClientConfig::load`]; the client
//! constructor takes the resulting value explicitly and nothing reads the
//! environment mid-call.

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheBackend;
use crate::usage::CounterBackend;

mod validation;

pub use validation::ConfigError;

/// Client configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (RASPLET_*)
/// 2. TOML config file (if RASPLET_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key injected into every outbound request.
    ///
    /// Set via RASPLET_API_KEY environment variable. Required at client
    /// construction; a missing or blank key aborts startup.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the schedule API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Daily request budget for one credential.
    ///
    /// Set via RASPLET_DAILY_LIMIT environment variable.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Fail calls once the daily budget is spent.
    ///
    /// Set via RASPLET_SAFE_MODE environment variable.
    #[serde(default = "default_true")]
    pub safe_mode: bool,

    /// Per-request info logging.
    #[serde(default)]
    pub verbose: bool,

    /// Page size injected into aggregated (auto-paginated) calls.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Whether responses are cached at all.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Serve exclusively from cache; a missing entry is an error.
    #[serde(default)]
    pub cache_only: bool,

    /// Skip cache reads; fresh responses are still stored.
    #[serde(default)]
    pub force_live: bool,

    /// Caller-supplied parameters dropped before the credential is
    /// injected.
    #[serde(default = "default_ignore_params")]
    pub ignore_params: Vec<String>,

    /// Where cached responses live.
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Explicit usage-counter choice; `None` infers one from the cache
    /// backend.
    #[serde(default)]
    pub counter_backend: Option<CounterBackend>,
}

fn default_base_url() -> String {
    "https://api.rasp.yandex.net/v3.0".into()
}

fn default_user_agent() -> String {
    "rasplet/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_daily_limit() -> u32 {
    500
}

fn default_page_size() -> u64 {
    100
}

fn default_ignore_params() -> Vec<String> {
    vec!["apikey".into()]
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            daily_limit: default_daily_limit(),
            safe_mode: true,
            verbose: false,
            page_size: default_page_size(),
            cache_enabled: true,
            cache_only: false,
            force_live: false,
            ignore_params: default_ignore_params(),
            cache_backend: CacheBackend::default(),
            counter_backend: None,
        }
    }
}

impl ClientConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `RASPLET_`
    /// 2. TOML file from `RASPLET_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RASPLET_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("RASPLET_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The configured API key, rejected when missing or blank.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is absent, empty, or
    /// whitespace-only.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::Missing {
                field: "api_key".into(),
                hint: "Set RASPLET_API_KEY environment variable".into(),
            }),
        }
    }

    /// The counter backend this configuration resolves to: the explicit
    /// choice, or one inferred from the cache backend.
    pub fn counter_backend_or_inferred(&self) -> CounterBackend {
        self.counter_backend
            .clone()
            .unwrap_or_else(|| CounterBackend::infer(&self.cache_backend))
    }
}
