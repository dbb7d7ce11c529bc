//! Cache storage adapters for upstream API responses.
//!
//! This module provides a persistent response cache behind one capability
//! trait. It supports:
//!
//! - SQLite (WAL mode, versioned migrations), flat-file, in-memory, and
//!   Redis backends
//! - Credential scrubbing via a decorator composed over any backend
//! - Forced caching of 2xx/3xx responses regardless of server headers

pub mod connection;
pub mod file;
pub mod fingerprint;
pub mod memory;
pub mod migrations;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::Error;
use fingerprint::strip_api_key_param;

pub use connection::Db;
pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "redis-backend")]
pub use redis::RedisStore;
pub use sqlite::SqliteStore;

/// A cached response plus the metadata needed for hit classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Request URL the entry was stored under (credential removed).
    pub url: String,
    /// HTTP status of the original response.
    pub status: u16,
    /// Raw response body text.
    pub body: String,
    /// RFC 3339 timestamp of when the entry was written.
    pub stored_at: String,
}

impl CachedResponse {
    /// Build an entry stamped with the current time.
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self { url: url.into(), status, body: body.into(), stored_at: Utc::now().to_rfc3339() }
    }
}

/// Statuses that are force-cached: the upstream API does not reliably
/// advertise cacheability, so the whole 2xx/3xx range is stored.
pub fn is_cacheable_status(status: u16) -> bool {
    matches!(status, 200..=206 | 300..=308)
}

/// Storage capability set implemented by every cache backend.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Persist an entry under the given fingerprint.
    async fn store(&self, key: &str, entry: CachedResponse) -> Result<(), Error>;

    /// Fetch an entry by fingerprint; `None` when absent.
    async fn retrieve(&self, key: &str) -> Result<Option<CachedResponse>, Error>;

    /// Remove an entry by fingerprint. Removing a missing entry is not an
    /// error.
    async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// Decorator that strips the credential parameter from an entry's URL
/// before it reaches the underlying backend, so stored entries never
/// embed the secret.
pub struct SanitizingStore {
    inner: Arc<dyn CacheStore>,
}

impl SanitizingStore {
    pub fn new(inner: Arc<dyn CacheStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for SanitizingStore {
    async fn store(&self, key: &str, entry: CachedResponse) -> Result<(), Error> {
        let entry = CachedResponse { url: strip_api_key_param(&entry.url), ..entry };
        self.inner.store(key, entry).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<CachedResponse>, Error> {
        self.inner.retrieve(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.inner.delete(key).await
    }
}

/// Cache backend selection; a configuration-time decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON document per entry under a directory.
    File { dir: PathBuf },
    /// Single SQLite database file.
    Sqlite { path: PathBuf },
    /// Process-local map; entries die with the process.
    Memory,
    /// Remote Redis instance (requires the `redis-backend` feature).
    Redis { url: String },
}

impl Default for CacheBackend {
    fn default() -> Self {
        CacheBackend::File { dir: PathBuf::from("./.cache/rasplet") }
    }
}

impl CacheBackend {
    /// Construct the configured backend.
    pub async fn build(&self) -> Result<Arc<dyn CacheStore>, Error> {
        match self {
            CacheBackend::File { dir } => Ok(Arc::new(FileStore::new(dir.clone()))),
            CacheBackend::Sqlite { path } => Ok(Arc::new(SqliteStore::open(path).await?)),
            CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            CacheBackend::Redis { url } => {
                #[cfg(feature = "redis-backend")]
                {
                    Ok(Arc::new(RedisStore::connect(url).await?))
                }
                #[cfg(not(feature = "redis-backend"))]
                {
                    let _ = url;
                    Err(Error::Unsupported("redis cache backend requires the redis-backend feature".into()))
                }
            }
        }
    }
}
