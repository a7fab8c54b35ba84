//! On-disk cache of raw search results.
//!
//! Each query maps to one file `<dir>/<key>` where the key is the lowercase
//! hex SHA-256 digest of the query text. The file holds the full JSON array
//! of raw entries. Writes go to a temp file in the same directory and are
//! renamed into place, so a reader sees either the old or the new array,
//! never a partial one. There is no locking: concurrent writers of the same
//! query race and the last rename wins.

use std::io::Write;
use std::path::PathBuf;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cached JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to move cache file into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Content-addressed cache key for a query.
pub fn cache_key(query: &str) -> String {
    format!("{:x}", Sha256::digest(query.as_bytes()))
}

/// Directory of cached search results, one JSON file per query.
#[derive(Debug, Clone)]
pub struct SearchCache {
    dir: PathBuf,
}

impl SearchCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cache file for `query` (which may not exist yet).
    pub fn path_for(&self, query: &str) -> PathBuf {
        self.dir.join(cache_key(query))
    }

    pub fn contains(&self, query: &str) -> bool {
        self.path_for(query).is_file()
    }

    /// Load the cached entries for `query`. Returns `None` on a miss.
    pub fn load(&self, query: &str) -> Result<Option<Vec<Value>>, CacheError> {
        let path = self.path_for(query);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(query, path = %path.display(), "cache miss");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let items: Vec<Value> = serde_json::from_str(&content)?;
        tracing::trace!(query, path = %path.display(), items = items.len(), "cache hit");
        Ok(Some(items))
    }

    /// Replace the cached entries for `query` with `items`.
    pub fn store(&self, query: &str, items: &[Value]) -> Result<PathBuf, CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(query);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        let bytes = serde_json::to_vec(items)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;

        tracing::trace!(query, path = %path.display(), items = items.len(), "cache write");
        Ok(path)
    }
}
