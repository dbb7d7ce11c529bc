//! SQLite usage counter.
//!
//! The increment is one `INSERT .. ON CONFLICT .. RETURNING` statement,
//! so concurrent writers sharing the database cannot lose updates.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_rusqlite::params;

use super::UsageCounter;
use crate::Error;
use crate::cache::connection::Db;

/// Usage counter over a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteCounter {
    db: Db,
    key_id: String,
}

impl SqliteCounter {
    /// Open (or create) the database at `path`.
    pub async fn open(path: impl AsRef<Path>, key_id: impl Into<String>) -> Result<Self, Error> {
        Ok(Self { db: Db::open(path).await?, key_id: key_id.into() })
    }

    /// In-memory database for testing.
    pub async fn open_in_memory(key_id: impl Into<String>) -> Result<Self, Error> {
        Ok(Self { db: Db::open_in_memory().await?, key_id: key_id.into() })
    }

    /// Reuse an already-open database, e.g. the cache database.
    pub fn from_db(db: Db, key_id: impl Into<String>) -> Self {
        Self { db, key_id: key_id.into() }
    }
}

#[async_trait]
impl UsageCounter for SqliteCounter {
    async fn get_count(&self, day: NaiveDate) -> Result<u64, Error> {
        let key_id = self.key_id.clone();
        let day = day.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let result = conn.query_row(
                    "SELECT count FROM usage_counts WHERE key_id = ?1 AND day = ?2",
                    params![key_id, day],
                    |row| row.get::<_, i64>(0),
                );

                match result {
                    Ok(count) => Ok(count as u64),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(0),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn increment(&self, day: NaiveDate) -> Result<u64, Error> {
        let key_id = self.key_id.clone();
        let day = day.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn
                    .query_row(
                        "INSERT INTO usage_counts (key_id, day, count) VALUES (?1, ?2, 1)
                        ON CONFLICT(key_id, day) DO UPDATE SET count = count + 1
                        RETURNING count",
                        params![key_id, day],
                        |row| row.get(0),
                    )
                    .map_err(Error::from)?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
