//! Upload path extraction from free-text CMS fields.
//!
//! CMS content columns hold HTML fragments, bare file paths, or absolute
//! URLs that embed an upload path. [`extract_uploads`] pulls every
//! `/uploads/...` reference out of such a value. Matching is deliberately
//! permissive: a path inside an HTML comment or a non-`src` attribute is
//! still reported.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{MediaReference, MediaReferenceSet, UPLOADS_MARKER};

static UPLOAD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/uploads/[A-Za-z0-9/_.\-]+").expect("invalid upload path regex"));

/// Extract every upload reference embedded in `text`.
///
/// Returns an empty set for `None`, empty input, or text that does not
/// contain the `/uploads/` marker. Matches that fail
/// [`MediaReference::parse`] (for example ones with a `..` segment) are
/// dropped.
pub fn extract_uploads(text: Option<&str>) -> MediaReferenceSet {
    let Some(text) = text else {
        return MediaReferenceSet::new();
    };
    if !text.contains(UPLOADS_MARKER) {
        return MediaReferenceSet::new();
    }

    UPLOAD_PATH
        .find_iter(text)
        .filter_map(|m| MediaReference::parse(m.as_str()))
        .collect()
}
