//! Redis usage counter.
//!
//! Increments are native `INCR` operations, atomic across any number of
//! client processes sharing the instance.

use async_trait::async_trait;
use chrono::NaiveDate;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::UsageCounter;
use crate::Error;

const KEY_PREFIX: &str = "rasplet:usage:";

/// Usage counter over a Redis connection.
#[derive(Clone)]
pub struct RedisCounter {
    conn: ConnectionManager,
    key_id: String,
}

impl RedisCounter {
    /// Connect to the Redis instance at `url`.
    pub async fn connect(url: &str, key_id: impl Into<String>) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, key_id: key_id.into() })
    }

    /// Reuse an existing managed connection, e.g. the cache store's.
    pub fn from_connection(conn: ConnectionManager, key_id: impl Into<String>) -> Self {
        Self { conn, key_id: key_id.into() }
    }

    fn redis_key(&self, day: NaiveDate) -> String {
        format!("{KEY_PREFIX}{}:{}", self.key_id, day)
    }
}

#[async_trait]
impl UsageCounter for RedisCounter {
    async fn get_count(&self, day: NaiveDate) -> Result<u64, Error> {
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn.get(self.redis_key(day)).await?;
        Ok(count.unwrap_or(0))
    }

    async fn increment(&self, day: NaiveDate) -> Result<u64, Error> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(self.redis_key(day), 1u64).await?;
        Ok(count)
    }
}
