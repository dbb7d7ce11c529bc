//! Client error types.

use rasplet_core::ConfigError;

/// Errors from the schedule API client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration rejected at construction (e.g. missing API key).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Safe mode stopped the call: the daily request budget is spent.
    #[error("daily API request limit exceeded: {count}/{limit}")]
    QuotaExceeded { count: u64, limit: u64 },

    /// Cache-only mode found no entry for the request.
    #[error("{0}")]
    CacheMiss(String),

    /// Endpoint name outside the supported set; a caller bug.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// A request URL could not be assembled.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Cache or counter backend failure.
    #[error(transparent)]
    Storage(#[from] rasplet_core::Error),

    /// Network/DNS/TLS failure, propagated from the transport unmodified.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
