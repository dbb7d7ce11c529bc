//! In-memory cache backend for tests and ephemeral use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CacheStore, CachedResponse};
use crate::Error;

/// Process-local cache backend; entries die with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn store(&self, key: &str, entry: CachedResponse) -> Result<(), Error> {
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<CachedResponse>, Error> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
