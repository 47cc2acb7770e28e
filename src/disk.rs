//! Local filesystem [`MediaStore`].
//!
//! A disk is a directory plus the public URL it is served under (see
//! `[disks.<name>]` in the configuration). `portal serve` mounts the
//! directory at `/storage`, so the default disk URL points back at the
//! server itself.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use portal_media_core::store::MediaStore;

use crate::config::{Config, DiskConfig};

/// A [`MediaStore`] rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
    base_url: String,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_disk_config(disk: &DiskConfig) -> Self {
        Self::new(&disk.root, &disk.url)
    }

    /// The disk selected by `media.local_disk`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::from_disk_config(config.local_disk()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage path onto the disk root. Returns `None` for absolute
    /// paths and paths with `..` or other non-plain components.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() || relative.is_absolute() {
            return None;
        }
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalDisk {
    async fn exists(&self, path: &str) -> Result<bool> {
        let Some(full) = self.resolve(path) else {
            return Ok(false);
        };
        match tokio::fs::metadata(&full).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}", full.display())),
        }
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let Some(full) = self.resolve(path) else {
            bail!("refusing to write outside the disk root: {}", path);
        };

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // Write beside the target then rename, so `exists` never sees a
        // partially written file.
        let mut tmp_name = full.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".part");
        let tmp = full.with_file_name(tmp_name);

        let written = match tokio::fs::write(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &full)
                .await
                .with_context(|| format!("Failed to move {} into place", full.display())),
            Err(e) => Err(e).with_context(|| format!("Failed to write {}", tmp.display())),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
