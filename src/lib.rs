//! # Portal Media
//!
//! Media mirroring and URL resolution for a marketing site whose content
//! lives in a legacy CMS database.
//!
//! CMS rows reference uploads as `/uploads/...` paths, either bare or
//! embedded in HTML. This crate finds those references, mirrors the files
//! from the legacy origin into local storage, and resolves a stored value
//! to the best URL to render it from.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌────────────┐
//! │ CMS tables  │──▶│   Extractor  │──▶│ Sync pass  │◀── origin (HTTP)
//! │  (SQLite)   │   │ /uploads/... │   │ fetch+put  │
//! └─────────────┘   └──────────────┘   └─────┬──────┘
//!                                            ▼
//!                   ┌──────────────┐   ┌────────────┐
//!  stored value ───▶│   Locator    │──▶│ Local disk │
//!                   │ local/remote │   │ /storage   │
//!                   └──────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! portal sources                 # check the configured content tables
//! portal media paths             # list every referenced upload
//! portal media sync              # mirror missing uploads
//! portal media sync --force      # re-download everything
//! portal media resolve /uploads/a.png
//! portal serve                   # serve /storage and /media/resolve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Read-only content database connection |
//! | [`content`] | Paginated reference collection from content tables |
//! | [`disk`] | Local filesystem media store |
//! | [`origin`] | Remote origin downloads |
//! | [`sync`] | The media sync pass |
//! | [`progress`] | Sync progress reporting |
//! | [`server`] | HTTP server |
//!
//! Extraction, resolution, and the store trait live in `portal-media-core`.

pub mod config;
pub mod content;
pub mod db;
pub mod disk;
pub mod logging;
pub mod origin;
pub mod progress;
pub mod server;
pub mod sources;
pub mod sync;
