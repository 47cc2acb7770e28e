//! Media URL resolution.
//!
//! Turns a stored media value (an absolute URL or a relative upload path)
//! into the URL a page should render. Resolution is an ordered decision
//! table:
//!
//! | # | Condition | Result |
//! |---|-----------|--------|
//! | 1 | value is `None` or blank | `None` |
//! | 2 | value starts with `http` (any case) | value unchanged |
//! | 3 | `{prefix}/{relative}` exists in the local store | local store URL |
//! | 4 | a remote origin is configured | `{origin}/{relative}` |
//! | 5 | otherwise | `None` |
//!
//! Only rule 3 touches storage, and only with an existence check. No
//! network request is ever made while resolving.

use std::sync::Arc;

use anyhow::Result;

use crate::models::{join_prefix, MediaSettings, ResolvedUrl};
use crate::store::MediaStore;

/// A stored value after the storage-independent rules (1 and 2) have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Rule 1: nothing to resolve.
    Blank,
    /// Rule 2: already absolute.
    Absolute(String),
    /// Needs the cache check. `relative` has no leading slash;
    /// `storage_path` is `relative` beneath the configured prefix.
    Relative {
        relative: String,
        storage_path: String,
    },
}

/// Apply rules 1 and 2, and compute the storage path for the rest.
pub fn classify(path: Option<&str>, prefix: &str) -> Lookup {
    let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
        return Lookup::Blank;
    };

    if is_absolute(path) {
        return Lookup::Absolute(path.to_string());
    }

    let relative = path.trim_start_matches('/').to_string();
    let storage_path = join_prefix(prefix, &relative);
    Lookup::Relative {
        relative,
        storage_path,
    }
}

/// Apply rules 3 to 5 to a relative value given the result of the cache
/// check.
pub fn choose(
    relative: &str,
    storage_path: &str,
    cached: bool,
    settings: &MediaSettings,
    store: &dyn MediaStore,
) -> Option<ResolvedUrl> {
    if cached {
        return Some(ResolvedUrl::Local(store.url(storage_path)));
    }

    settings.origin().map(|origin| {
        ResolvedUrl::Remote(format!("{}/{}", origin, relative.trim_matches('/')))
    })
}

fn is_absolute(path: &str) -> bool {
    path.get(..4)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http"))
}

/// Resolves stored media values against a local store and an optional
/// remote origin.
#[derive(Clone)]
pub struct MediaLocator {
    settings: MediaSettings,
    store: Arc<dyn MediaStore>,
}

impl MediaLocator {
    pub fn new(settings: MediaSettings, store: Arc<dyn MediaStore>) -> Self {
        Self { settings, store }
    }

    pub fn settings(&self) -> &MediaSettings {
        &self.settings
    }

    /// Resolve `path` and report which rule produced the URL.
    pub async fn locate(&self, path: Option<&str>) -> Result<Option<ResolvedUrl>> {
        match classify(path, self.settings.local_prefix()) {
            Lookup::Blank => Ok(None),
            Lookup::Absolute(url) => Ok(Some(ResolvedUrl::Absolute(url))),
            Lookup::Relative {
                relative,
                storage_path,
            } => {
                let cached = self.store.exists(&storage_path).await?;
                Ok(choose(
                    &relative,
                    &storage_path,
                    cached,
                    &self.settings,
                    self.store.as_ref(),
                ))
            }
        }
    }

    /// Resolve `path` to a display URL.
    pub async fn resolve(&self, path: Option<&str>) -> Result<Option<String>> {
        Ok(self.locate(path).await?.map(ResolvedUrl::into_url))
    }
}
