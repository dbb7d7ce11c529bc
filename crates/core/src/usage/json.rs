//! Flat-file usage counter.
//!
//! The whole counter state is one JSON object mapping
//! `<key_id>:<day>` to a count. Increments are read-modify-write with no
//! cross-process locking, so this backend is single-process only; use the
//! SQLite or Redis counter when several processes share a budget.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::UsageCounter;
use crate::Error;

/// Usage counter persisted in a single JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileCounter {
    path: PathBuf,
    key_id: String,
}

impl JsonFileCounter {
    pub fn new(path: impl Into<PathBuf>, key_id: impl Into<String>) -> Self {
        Self { path: path.into(), key_id: key_id.into() }
    }

    fn record_key(&self, day: NaiveDate) -> String {
        format!("{}:{}", self.key_id, day)
    }

    async fn load(&self) -> Result<HashMap<String, u64>, Error> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, data: &HashMap<String, u64>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec(data)?).await?;
        Ok(())
    }
}

#[async_trait]
impl UsageCounter for JsonFileCounter {
    async fn get_count(&self, day: NaiveDate) -> Result<u64, Error> {
        Ok(self.load().await?.get(&self.record_key(day)).copied().unwrap_or(0))
    }

    async fn increment(&self, day: NaiveDate) -> Result<u64, Error> {
        let mut data = self.load().await?;
        let count = data.entry(self.record_key(day)).or_insert(0);
        *count += 1;
        let new_value = *count;
        self.save(&data).await?;
        Ok(new_value)
    }
}
