//! Storage abstraction for cached media.
//!
//! The [`MediaStore`] trait covers the three operations the locator and the
//! sync pass need from local object storage: an existence check, a write,
//! and the public URL of a stored path. Paths are storage-relative
//! (`portal-media/uploads/img/a.png`).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

/// Abstract local object storage.
///
/// Implementations are expected to provide read-your-writes consistency:
/// after [`put`](MediaStore::put) returns, [`exists`](MediaStore::exists)
/// for the same path returns `true`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Returns `true` if an object is stored at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Store `bytes` at `path`, replacing any existing object.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Public absolute URL under which `path` is served.
    fn url(&self, path: &str) -> String;
}
