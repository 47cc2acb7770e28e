//! In-memory [`MediaStore`] implementation for tests.
//!
//! Objects live in a `HashMap` behind `std::sync::RwLock`. Every
//! [`put`](MediaStore::put) is counted so callers can assert how many writes
//! a sync pass performed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::MediaStore;

/// In-memory media store.
pub struct InMemoryMediaStore {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl InMemoryMediaStore {
    /// Create an empty store whose URLs are rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed an object without counting it as a write.
    pub fn with_object(self, path: &str, bytes: &[u8]) -> Self {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(path.to_string(), bytes.to_vec());
        }
        self
    }

    /// Contents stored at `path`, if any.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().ok()?.get(path).cloned()
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put` calls made so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new("http://localhost/storage")
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("media store lock poisoned"))?;
        Ok(objects.contains_key(path))
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("media store lock poisoned"))?;
        objects.insert(path.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
