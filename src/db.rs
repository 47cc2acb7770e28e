//! Connection to the legacy CMS content database.
//!
//! The content schema belongs to the back-office system, so the database is
//! opened read-only and never created: a missing file is a configuration
//! error rather than an empty database.

use anyhow::{bail, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

/// Open a read-only connection pool to the configured content database.
///
/// # Errors
///
/// Returns an error if the database file does not exist or cannot be
/// opened.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if !db_path.exists() {
        bail!("content database not found: {}", db_path.display());
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .read_only(true)
        .create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
