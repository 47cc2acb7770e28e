//! Core data models shared by the extractor, the locator, and the sync pass.
//!
//! A [`MediaReference`] is the canonical form of an upload path found in CMS
//! content. References are collected into a [`MediaReferenceSet`], resolved
//! into a [`ResolvedUrl`] for display, and mirrored into local storage under
//! the prefix carried by [`MediaSettings`].

use std::borrow::Borrow;
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Literal marker every upload path contains.
pub const UPLOADS_MARKER: &str = "/uploads/";

/// Disk name used when none is configured.
pub const DEFAULT_LOCAL_DISK: &str = "public";

/// Storage prefix used when none is configured.
pub const DEFAULT_LOCAL_PREFIX: &str = "portal-media";

/// A normalized upload path such as `/uploads/img/a.png`.
///
/// Invariants, enforced by [`MediaReference::parse`]:
///
/// - exactly one leading `/`, followed by `uploads/` and at least one more byte
/// - only `A-Z a-z 0-9 / _ . -`
/// - no `..` segment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MediaReference(String);

impl MediaReference {
    /// Normalize and validate a raw path. Returns `None` when the value is
    /// not an upload path.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = format!("/{}", raw.trim_start_matches('/'));

        if !normalized.starts_with(UPLOADS_MARKER) || normalized.len() == UPLOADS_MARKER.len() {
            return None;
        }
        if !normalized.bytes().all(is_path_byte) {
            return None;
        }
        if normalized.split('/').any(|segment| segment == "..") {
            return None;
        }

        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without its leading slash (`uploads/img/a.png`).
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    /// Location of the cached copy beneath `prefix` (`portal-media/uploads/img/a.png`).
    pub fn storage_path(&self, prefix: &str) -> String {
        join_prefix(prefix, self.relative())
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MediaReference {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MediaReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub(crate) fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'/' | b'_' | b'.' | b'-')
}

/// Join a storage prefix and a relative path with exactly one `/` between
/// them. An empty prefix yields the relative path unchanged.
pub fn join_prefix(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let relative = relative.trim_start_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// Deduplicated collection of references.
///
/// Order carries no meaning, but iteration is sorted so that sync runs and
/// listings are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MediaReferenceSet(BTreeSet<MediaReference>);

impl MediaReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference. Returns `false` if it was already present.
    pub fn insert(&mut self, reference: MediaReference) -> bool {
        self.0.insert(reference)
    }

    /// Union `other` into this set.
    pub fn merge(&mut self, other: MediaReferenceSet) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, MediaReference> {
        self.0.iter()
    }
}

impl FromIterator<MediaReference> for MediaReferenceSet {
    fn from_iter<I: IntoIterator<Item = MediaReference>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<MediaReference> for MediaReferenceSet {
    fn extend<I: IntoIterator<Item = MediaReference>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for MediaReferenceSet {
    type Item = MediaReference;
    type IntoIter = btree_set::IntoIter<MediaReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MediaReferenceSet {
    type Item = &'a MediaReference;
    type IntoIter = btree_set::Iter<'a, MediaReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The URL a stored media value should be displayed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedUrl {
    /// The stored value was already an absolute URL; returned untouched.
    Absolute(String),
    /// Served from the local cache.
    Local(String),
    /// Rewritten onto the remote origin.
    Remote(String),
}

impl ResolvedUrl {
    pub fn as_str(&self) -> &str {
        match self {
            ResolvedUrl::Absolute(url) | ResolvedUrl::Local(url) | ResolvedUrl::Remote(url) => url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            ResolvedUrl::Absolute(url) | ResolvedUrl::Local(url) | ResolvedUrl::Remote(url) => url,
        }
    }

    /// Short label used in JSON responses and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedUrl::Absolute(_) => "absolute",
            ResolvedUrl::Local(_) => "local",
            ResolvedUrl::Remote(_) => "remote",
        }
    }
}

/// Media configuration passed explicitly to the locator and the sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    origin: Option<String>,
    pub local_disk: String,
    local_prefix: String,
}

impl MediaSettings {
    pub fn new(
        origin: Option<&str>,
        local_disk: impl Into<String>,
        local_prefix: impl Into<String>,
    ) -> Self {
        let origin = origin
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty());
        Self {
            origin,
            local_disk: local_disk.into(),
            local_prefix: local_prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Remote origin base URL without a trailing slash, if configured.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Local storage prefix without surrounding slashes.
    pub fn local_prefix(&self) -> &str {
        &self.local_prefix
    }

    /// `{origin}/{relative}` for a reference, if an origin is configured.
    pub fn origin_url(&self, reference: &MediaReference) -> Option<String> {
        self.origin()
            .map(|origin| format!("{}/{}", origin, reference.relative()))
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self::new(None, DEFAULT_LOCAL_DISK, DEFAULT_LOCAL_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_leading_slashes() {
        let r = MediaReference::parse("//uploads/a.png").unwrap();
        assert_eq!(r.as_str(), "/uploads/a.png");
        assert_eq!(r.relative(), "uploads/a.png");

        let r = MediaReference::parse("uploads/a.png").unwrap();
        assert_eq!(r.as_str(), "/uploads/a.png");
    }

    #[test]
    fn parse_rejects_non_upload_paths() {
        assert!(MediaReference::parse("/images/a.png").is_none());
        assert!(MediaReference::parse("/uploads/").is_none());
        assert!(MediaReference::parse("").is_none());
        assert!(MediaReference::parse("/uploads/a b.png").is_none());
        assert!(MediaReference::parse("/uploads/a.png?v=2").is_none());
    }

    #[test]
    fn parse_rejects_traversal() {
        assert!(MediaReference::parse("/uploads/../etc/passwd").is_none());
        assert!(MediaReference::parse("/uploads/img/..").is_none());
        // dots inside a file name are fine
        assert!(MediaReference::parse("/uploads/a..b.png").is_some());
    }

    #[test]
    fn storage_path_joins_prefix() {
        let r = MediaReference::parse("/uploads/img/a.png").unwrap();
        assert_eq!(r.storage_path("portal-media"), "portal-media/uploads/img/a.png");
        assert_eq!(r.storage_path("/portal-media/"), "portal-media/uploads/img/a.png");
        assert_eq!(r.storage_path(""), "uploads/img/a.png");
    }

    #[test]
    fn set_deduplicates_and_sorts() {
        let set: MediaReferenceSet = ["/uploads/b.png", "/uploads/a.png", "uploads/b.png"]
            .iter()
            .filter_map(|p| MediaReference::parse(p))
            .collect();
        let paths: Vec<&str> = set.iter().map(|r| r.as_str()).collect();
        assert_eq!(paths, vec!["/uploads/a.png", "/uploads/b.png"]);
        assert!(set.contains("/uploads/a.png"));
        assert!(!set.contains("uploads/a.png"));
        assert!(!set.contains("/uploads/c.png"));
    }

    #[test]
    fn settings_trim_origin_and_prefix() {
        let s = MediaSettings::new(Some("https://cdn.example/"), "public", "/portal-media/");
        assert_eq!(s.origin(), Some("https://cdn.example"));
        assert_eq!(s.local_prefix(), "portal-media");

        let s = MediaSettings::new(Some("  /"), "public", "portal-media");
        assert_eq!(s.origin(), None);
    }

    #[test]
    fn resolved_url_kind() {
        assert_eq!(ResolvedUrl::Local("x".into()).kind(), "local");
        assert_eq!(ResolvedUrl::Remote("x".into()).as_str(), "x");
        assert_eq!(ResolvedUrl::Absolute("y".into()).into_url(), "y");
    }
}
