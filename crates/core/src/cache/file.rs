//! Flat-file cache backend.
//!
//! One JSON document per entry, named by the entry's fingerprint. Keys
//! are hex digests, so file names never need escaping.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{CacheStore, CachedResponse};
use crate::Error;

/// Cache backend over a directory of JSON files.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` as the cache root. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn store(&self, key: &str, entry: CachedResponse) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let payload = serde_json::to_vec(&entry)?;
        tokio::fs::write(self.path_for(key), payload).await?;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<CachedResponse>, Error> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
