//! Daily API usage counters over pluggable backends.
//!
//! Every live request against the upstream API consumes quota; these
//! counters persist a per-day count so multiple runs (and, for the
//! SQLite and Redis backends, multiple processes) share one budget.
//!
//! Records are keyed by (credential identifier, calendar day). The
//! identifier is a short digest of the API key, so the raw secret never
//! lands in counter storage.

pub mod json;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;
use crate::cache::CacheBackend;

pub use json::JsonFileCounter;
#[cfg(feature = "redis-backend")]
pub use redis::RedisCounter;
pub use sqlite::SqliteCounter;

/// Derive the storage identifier for a credential.
pub fn key_id(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(&hasher.finalize()[..6])
}

/// Per-day request counter.
///
/// `increment` must not lose updates under concurrent writers sharing a
/// backend; the SQLite and Redis implementations lean on their native
/// atomic primitives for this.
#[async_trait]
pub trait UsageCounter: Send + Sync {
    /// Request count recorded for `day`; 0 when no record exists.
    async fn get_count(&self, day: NaiveDate) -> Result<u64, Error>;

    /// Add one to `day`'s count and return the new value.
    async fn increment(&self, day: NaiveDate) -> Result<u64, Error>;
}

/// Counter backend selection; a configuration-time decision, never
/// re-evaluated per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CounterBackend {
    /// Flat JSON file; single-process use only.
    Json { path: PathBuf },
    /// SQLite database file (may be shared with the cache database).
    Sqlite { path: PathBuf },
    /// Remote Redis instance (requires the `redis-backend` feature).
    Redis { url: String },
}

impl CounterBackend {
    /// Derive a counter backend from the cache backend already in use:
    /// SQLite cache shares its database file, Redis cache shares its URL,
    /// anything else falls back to the JSON file.
    pub fn infer(cache: &CacheBackend) -> Self {
        match cache {
            CacheBackend::Sqlite { path } => CounterBackend::Sqlite { path: path.clone() },
            CacheBackend::Redis { url } => CounterBackend::Redis { url: url.clone() },
            CacheBackend::File { .. } | CacheBackend::Memory => {
                CounterBackend::Json { path: PathBuf::from("./rasplet-usage.json") }
            }
        }
    }

    /// Construct the configured backend for the given credential
    /// identifier.
    pub async fn build(&self, key_id: &str) -> Result<Arc<dyn UsageCounter>, Error> {
        match self {
            CounterBackend::Json { path } => Ok(Arc::new(JsonFileCounter::new(path.clone(), key_id))),
            CounterBackend::Sqlite { path } => Ok(Arc::new(SqliteCounter::open(path, key_id).await?)),
            CounterBackend::Redis { url } => {
                #[cfg(feature = "redis-backend")]
                {
                    Ok(Arc::new(RedisCounter::connect(url, key_id).await?))
                }
                #[cfg(not(feature = "redis-backend"))]
                {
                    let _ = url;
                    Err(Error::Unsupported("redis counter backend requires the redis-backend feature".into()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_is_stable_and_short() {
        let id1 = key_id("some-api-key");
        let id2 = key_id("some-api-key");
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 12);
        assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_id_differs_per_credential() {
        assert_ne!(key_id("key-one"), key_id("key-two"));
    }

    #[test]
    fn test_key_id_never_contains_credential() {
        let id = key_id("super-secret-credential");
        assert!(!id.contains("secret"));
    }

    #[test]
    fn test_infer_follows_cache_backend() {
        let sqlite = CacheBackend::Sqlite { path: PathBuf::from("/tmp/cache.sqlite") };
        assert_eq!(CounterBackend::infer(&sqlite), CounterBackend::Sqlite { path: PathBuf::from("/tmp/cache.sqlite") });

        let redis = CacheBackend::Redis { url: "redis://127.0.0.1/".into() };
        assert_eq!(CounterBackend::infer(&redis), CounterBackend::Redis { url: "redis://127.0.0.1/".into() });

        let file = CacheBackend::File { dir: PathBuf::from("/tmp/cache") };
        assert!(matches!(CounterBackend::infer(&file), CounterBackend::Json { .. }));

        assert!(matches!(CounterBackend::infer(&CacheBackend::Memory), CounterBackend::Json { .. }));
    }
}
