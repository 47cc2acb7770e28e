//! # Portal Media Core
//!
//! Shared, I/O-free logic for portal-media: the media data model, upload
//! path extraction from CMS text fields, the URL resolution decision table,
//! and the [`store::MediaStore`] abstraction.
//!
//! This crate contains no tokio, sqlx, reqwest, or filesystem code. Native
//! backends (local disk, HTTP origin, SQLite content) live in the
//! `portal-media` crate.

pub mod extract;
pub mod locate;
pub mod models;
pub mod store;
