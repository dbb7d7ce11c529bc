//! SQLite cache backend.
//!
//! Entries live in the `http_cache` table with UPSERT write semantics.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::params;

use super::connection::Db;
use super::{CacheStore, CachedResponse};
use crate::Error;

/// Cache backend over a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: Db,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self { db: Db::open(path).await? })
    }

    /// In-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        Ok(Self { db: Db::open_in_memory().await? })
    }

    /// Reuse an already-open database, e.g. one shared with a usage
    /// counter.
    pub fn from_db(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn store(&self, key: &str, entry: CachedResponse) -> Result<(), Error> {
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO http_cache (key_hash, url, status, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(key_hash) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![key, entry.url, entry.status, entry.body, entry.stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn retrieve(&self, key: &str) -> Result<Option<CachedResponse>, Error> {
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url, status, body, stored_at FROM http_cache WHERE key_hash = ?1")?;

                let result = stmt.query_row(params![key], |row| {
                    Ok(CachedResponse {
                        url: row.get(0)?,
                        status: row.get(1)?,
                        body: row.get(2)?,
                        stored_at: row.get(3)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM http_cache WHERE key_hash = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
