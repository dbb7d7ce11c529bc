//! Redis cache backend.
//!
//! Entries are stored as JSON strings under `rasplet:cache:<fingerprint>`.
//! Lifetime management (eviction, TTL policies) belongs to the Redis
//! deployment, not this client.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{CacheStore, CachedResponse};
use crate::Error;

const KEY_PREFIX: &str = "rasplet:cache:";

/// Cache backend over a Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis instance at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn redis_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn store(&self, key: &str, entry: CachedResponse) -> Result<(), Error> {
        let payload = serde_json::to_string(&entry)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(Self::redis_key(key), payload).await?;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<CachedResponse>, Error> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(Self::redis_key(key)).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::redis_key(key)).await?;
        Ok(())
    }
}
