//! Media sync pass.
//!
//! Mirrors every upload referenced by CMS content from the remote origin
//! into local storage:
//!
//! 1. Require a configured origin (fail before any other work otherwise).
//! 2. Collect the global reference set from all configured tables.
//! 3. For each reference, skip it if already cached (unless `--force`),
//!    otherwise download `{origin}/{relative}` and store it under
//!    `{prefix}/{relative}`.
//!
//! Each reference is independent. A download that fails (non-2xx or a
//! transport error), or a file the disk cannot stat or store, is logged as a
//! warning and the pass moves on; there is no retry. A later run without `--force` fetches only what is still
//! missing, so an interrupted pass is safely resumable.

use std::time::Duration;

use chrono::{DateTime, Utc};
use portal_media_core::models::{MediaReferenceSet, MediaSettings};
use portal_media_core::store::MediaStore;
use thiserror::Error;

use crate::config::Config;
use crate::content::collect_media_paths;
use crate::db;
use crate::disk::LocalDisk;
use crate::origin::{FetchError, HttpOrigin, Origin};
use crate::progress::{SyncProgressEvent, SyncProgressReporter};

/// Errors that abort a whole sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("media.base_url is not configured (set [media].base_url or PORTAL_MEDIA_BASE_URL)")]
    MissingOrigin,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A reference whose local copy could not be checked or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFailure {
    /// Storage path of the reference on the local disk.
    pub target: String,
    pub message: String,
}

impl StorageFailure {
    fn new(target: &str, err: &anyhow::Error) -> Self {
        tracing::warn!(%target, error = %format!("{:#}", err), "storage failed");
        Self {
            target: target.to_string(),
            message: format!("{:#}", err),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Re-download references that are already cached.
    pub force: bool,
    /// Report what would be downloaded without fetching or writing.
    pub dry_run: bool,
}

/// Outcome of a sync pass.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Distinct references found in content.
    pub considered: usize,
    pub downloaded: usize,
    /// Already cached and left untouched.
    pub skipped: usize,
    pub failures: Vec<FetchError>,
    pub storage_failures: Vec<StorageFailure>,
    /// Dry run only: URLs that would have been fetched.
    pub pending: Vec<String>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    fn start(considered: usize, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            considered,
            downloaded: 0,
            skipped: 0,
            failures: Vec::new(),
            storage_failures: Vec::new(),
            pending: Vec::new(),
            dry_run,
            started_at: now,
            finished_at: now,
        }
    }
}

/// Run the sync pass over an already collected reference set.
pub async fn sync_media(
    settings: &MediaSettings,
    references: &MediaReferenceSet,
    store: &dyn MediaStore,
    origin: &dyn Origin,
    options: SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncReport, SyncError> {
    let base = settings.origin().ok_or(SyncError::MissingOrigin)?;
    let mut report = SyncReport::start(references.len(), options.dry_run);
    let total = references.len() as u64;
    if total > 0 {
        tracing::info!("syncing {} media references from {}", total, base);
    }

    for (i, reference) in references.iter().enumerate() {
        progress.report(SyncProgressEvent::Fetching {
            path: reference.to_string(),
            n: i as u64 + 1,
            total,
        });

        let target = reference.storage_path(settings.local_prefix());
        if !options.force {
            match store.exists(&target).await {
                Ok(true) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    report.storage_failures.push(StorageFailure::new(&target, &e));
                    continue;
                }
            }
        }

        let url = format!("{}/{}", base, reference.relative());
        if options.dry_run {
            report.pending.push(url);
            continue;
        }

        match origin.fetch(&url).await {
            Ok(bytes) => match store.put(&target, &bytes).await {
                Ok(()) => {
                    tracing::debug!(%url, %target, bytes = bytes.len(), "cached");
                    report.downloaded += 1;
                }
                Err(e) => report.storage_failures.push(StorageFailure::new(&target, &e)),
            },
            Err(e) => {
                tracing::warn!(url = %e.url(), reason = %e.reason(), "download failed");
                report.failures.push(e);
            }
        }
    }

    report.finished_at = Utc::now();
    Ok(report)
}

/// Entry point for `portal media sync`: collect references from the
/// content database and mirror them onto the configured disk.
pub async fn run_sync(
    config: &Config,
    options: SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncReport, SyncError> {
    let settings = config.media_settings();
    if settings.origin().is_none() {
        return Err(SyncError::MissingOrigin);
    }

    let pool = db::connect(config).await?;
    let references = collect_media_paths(
        &pool,
        &config.sync.sources,
        config.sync.page_size,
        progress,
    )
    .await;
    pool.close().await;
    let references = references?;

    let store = LocalDisk::from_config(config)?;
    let origin = HttpOrigin::new(Duration::from_secs(config.sync.timeout_secs))?;

    sync_media(&settings, &references, &store, &origin, options, progress).await
}

/// Print the operator-facing summary on stdout.
pub fn print_report(report: &SyncReport) {
    if report.considered == 0 {
        println!("sync media: nothing to sync (no upload references found)");
        println!("ok");
        return;
    }

    if report.dry_run {
        println!("sync media (dry-run)");
        println!("  considered: {}", report.considered);
        println!("  cached: {}", report.skipped);
        println!("  missing: {}", report.pending.len());
        for url in &report.pending {
            println!("    {}", url);
        }
        if !report.storage_failures.is_empty() {
            println!("  storage errors: {}", report.storage_failures.len());
        }
        println!("ok");
        return;
    }

    let elapsed = report.finished_at - report.started_at;
    println!("sync media");
    println!("  considered: {}", report.considered);
    println!("  downloaded: {}", report.downloaded);
    println!("  skipped: {}", report.skipped);
    println!("  failed: {}", report.failures.len());
    println!("  storage errors: {}", report.storage_failures.len());
    println!("  elapsed: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    println!("ok");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use portal_media_core::extract::extract_uploads;
    use portal_media_core::models::MediaReference;
    use portal_media_core::store::memory::InMemoryMediaStore;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::disk::LocalDisk;

    /// Origin serving a fixed map of URL → response, recording every call.
    #[derive(Default)]
    struct FakeOrigin {
        bodies: HashMap<String, Result<Vec<u8>, FetchError>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeOrigin {
        fn serve(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), Ok(body.to_vec()));
            self
        }

        fn fail(mut self, url: &str, err: FetchError) -> Self {
            self.bodies.insert(url.to_string(), Err(err));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    /// Origin that answers every URL with the URL itself as the body.
    #[derive(Default)]
    struct EchoOrigin {
        calls: Mutex<Vec<String>>,
    }

    impl EchoOrigin {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Origin for EchoOrigin {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            Ok(url.as_bytes().to_vec())
        }
    }

    #[async_trait]
    impl Origin for FakeOrigin {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.bodies.get(url).cloned().unwrap_or(Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }))
        }
    }

    fn settings(origin: Option<&str>) -> MediaSettings {
        MediaSettings::new(origin, "public", "portal-media")
    }

    fn refs(paths: &[&str]) -> MediaReferenceSet {
        paths
            .iter()
            .map(|p| MediaReference::parse(p).unwrap())
            .collect()
    }

    const ORIGIN: &str = "https://cdn.example";

    #[tokio::test]
    async fn missing_origin_does_nothing() {
        let store = InMemoryMediaStore::default();
        let origin = FakeOrigin::default();

        let err = sync_media(
            &settings(None),
            &refs(&["/uploads/a.png"]),
            &store,
            &origin,
            SyncOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SyncError::MissingOrigin));
        assert!(origin.calls().is_empty());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn empty_reference_set_is_trivial_success() {
        let store = InMemoryMediaStore::default();
        let origin = FakeOrigin::default();
        let report = sync_media(
            &settings(Some(ORIGIN)),
            &MediaReferenceSet::new(),
            &store,
            &origin,
            SyncOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.considered, 0);
        assert_eq!(report.downloaded, 0);
        assert!(origin.calls().is_empty());
    }

    #[tokio::test]
    async fn downloads_and_stores_verbatim() {
        let store = InMemoryMediaStore::default();
        let origin = FakeOrigin::default().serve("https://cdn.example/uploads/img/a.png", b"\x00\x01png");

        let report = sync_media(
            &settings(Some("https://cdn.example/")),
            &refs(&["/uploads/img/a.png"]),
            &store,
            &origin,
            SyncOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(
            store.get("portal-media/uploads/img/a.png").unwrap(),
            b"\x00\x01png"
        );
    }

    #[tokio::test]
    async fn second_run_is_idempotent_unless_forced() {
        let store = InMemoryMediaStore::default();
        let origin = FakeOrigin::default()
            .serve("https://cdn.example/uploads/a.png", b"a")
            .serve("https://cdn.example/uploads/b.png", b"b");
        let references = refs(&["/uploads/a.png", "/uploads/b.png"]);
        let s = settings(Some(ORIGIN));

        let first = sync_media(&s, &references, &store, &origin, SyncOptions::default(), &NoProgress)
            .await
            .unwrap();
        assert_eq!(first.downloaded, 2);
        assert_eq!(origin.calls().len(), 2);

        let second = sync_media(&s, &references, &store, &origin, SyncOptions::default(), &NoProgress)
            .await
            .unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(origin.calls().len(), 2);

        let forced = SyncOptions {
            force: true,
            dry_run: false,
        };
        let third = sync_media(&s, &references, &store, &origin, forced, &NoProgress)
            .await
            .unwrap();
        assert_eq!(third.downloaded, 2);
        assert_eq!(origin.calls().len(), 4);
        assert_eq!(store.writes(), 4);
    }

    #[tokio::test]
    async fn failures_are_reported_and_skipped() {
        let store = InMemoryMediaStore::default();
        let origin = FakeOrigin::default()
            .serve("https://cdn.example/uploads/ok.png", b"ok")
            .fail(
                "https://cdn.example/uploads/slow.png",
                FetchError::Transport {
                    url: "https://cdn.example/uploads/slow.png".to_string(),
                    message: "operation timed out".to_string(),
                },
            );

        let report = sync_media(
            &settings(Some(ORIGIN)),
            &refs(&["/uploads/gone.png", "/uploads/ok.png", "/uploads/slow.png"]),
            &store,
            &origin,
            SyncOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.considered, 3);
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(origin.calls().len(), 3);
        assert!(store.exists("portal-media/uploads/ok.png").await.unwrap());
        assert!(!store.exists("portal-media/uploads/gone.png").await.unwrap());
        assert_eq!(
            report.failures[0],
            FetchError::Status {
                url: "https://cdn.example/uploads/gone.png".to_string(),
                status: 404
            }
        );
    }

    #[tokio::test]
    async fn shared_reference_is_fetched_once() {
        let mut references = extract_uploads(Some("<img src=\"/uploads/shared.png\">"));
        references.merge(extract_uploads(Some("banner: /uploads/shared.png")));

        let store = InMemoryMediaStore::default();
        let origin = FakeOrigin::default().serve("https://cdn.example/uploads/shared.png", b"s");

        let report = sync_media(
            &settings(Some(ORIGIN)),
            &references,
            &store,
            &origin,
            SyncOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(origin.calls(), vec!["https://cdn.example/uploads/shared.png"]);
    }

    #[tokio::test]
    async fn dry_run_neither_fetches_nor_writes() {
        let store = InMemoryMediaStore::default().with_object("portal-media/uploads/a.png", b"a");
        let origin = FakeOrigin::default();
        let options = SyncOptions {
            force: false,
            dry_run: true,
        };

        let report = sync_media(
            &settings(Some(ORIGIN)),
            &refs(&["/uploads/a.png", "/uploads/b.png"]),
            &store,
            &origin,
            options,
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.pending, vec!["https://cdn.example/uploads/b.png"]);
        assert!(origin.calls().is_empty());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn unstorable_references_do_not_block_the_rest() {
        let tmp = TempDir::new().unwrap();
        let disk = LocalDisk::new(tmp.path(), "http://site.test/storage");
        let origin = EchoOrigin::default();

        // `/uploads/img/` cannot be a file, and `/uploads/a.png/b.png` needs
        // `a.png` to be a directory. Both sort before assets that must
        // still be fetched.
        let mut references =
            extract_uploads(Some("see /uploads/img/ folder, <img src=\"/uploads/img/z.png\">"));
        references.merge(extract_uploads(Some("/uploads/a.png /uploads/a.png/b.png /uploads/b.png")));

        let report = sync_media(
            &settings(Some(ORIGIN)),
            &references,
            &disk,
            &origin,
            SyncOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.considered, 5);
        assert_eq!(report.downloaded, 3);
        assert!(report.failures.is_empty());
        let failed: Vec<&str> = report
            .storage_failures
            .iter()
            .map(|f| f.target.as_str())
            .collect();
        assert_eq!(
            failed,
            vec!["portal-media/uploads/a.png/b.png", "portal-media/uploads/img/"]
        );

        for path in ["uploads/a.png", "uploads/b.png", "uploads/img/z.png"] {
            assert!(disk.exists(&format!("portal-media/{}", path)).await.unwrap());
        }
        assert!(!tmp.path().join("portal-media/uploads/img.part").exists());

        // The next run skips what was stored and retries only the two
        // references that cannot be stored.
        let rerun = sync_media(
            &settings(Some(ORIGIN)),
            &references,
            &disk,
            &origin,
            SyncOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap();
        assert_eq!(rerun.skipped, 3);
        assert_eq!(rerun.storage_failures.len(), 2);
        assert_eq!(origin.calls().len(), 7);
    }
}
