//! Upload reference collection from CMS content tables.
//!
//! One generic routine walks every configured `(table, columns)` pair with
//! keyset pagination on the integer primary key and feeds each column value
//! through [`extract_uploads`]. Pages are bounded by `sync.page_size`, so
//! memory use does not grow with table size.

use anyhow::{Context, Result};
use portal_media_core::extract::extract_uploads;
use portal_media_core::models::MediaReferenceSet;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::SourceTable;
use crate::progress::{SyncProgressEvent, SyncProgressReporter};

/// Scan every source and return the union of all upload references.
pub async fn collect_media_paths(
    pool: &SqlitePool,
    sources: &[SourceTable],
    page_size: i64,
    progress: &dyn SyncProgressReporter,
) -> Result<MediaReferenceSet> {
    let mut paths = MediaReferenceSet::new();

    for source in sources {
        progress.report(SyncProgressEvent::Collecting {
            table: source.table.clone(),
        });
        let rows = scan_table(pool, source, page_size, &mut paths).await?;
        tracing::debug!(table = %source.table, rows, total = paths.len(), "scanned table");
    }

    Ok(paths)
}

/// Scan one table page by page, merging its references into `paths`.
/// Returns the number of rows visited.
async fn scan_table(
    pool: &SqlitePool,
    source: &SourceTable,
    page_size: i64,
    paths: &mut MediaReferenceSet,
) -> Result<u64> {
    let columns = source
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    // Identifiers are validated at config load.
    let select = format!(
        "SELECT \"id\", {} FROM \"{}\" WHERE \"id\" > ? ORDER BY \"id\" LIMIT ?",
        columns, source.table
    );

    let mut last_id = i64::MIN;
    let mut visited = 0u64;

    loop {
        let rows = sqlx::query(&select)
            .bind(last_id)
            .bind(page_size)
            .fetch_all(pool)
            .await
            .with_context(|| format!("Failed to read table '{}'", source.table))?;

        for row in &rows {
            for column in &source.columns {
                paths.merge(extract_uploads(text_value(row, column).as_deref()));
            }
        }
        visited += rows.len() as u64;

        let Some(last) = rows.last() else {
            break;
        };
        last_id = last
            .try_get("id")
            .with_context(|| format!("table '{}' has no integer id column", source.table))?;

        if (rows.len() as i64) < page_size {
            break;
        }
    }

    Ok(visited)
}

/// Column value as text; NULL and non-text values count as absent.
fn text_value(row: &SqliteRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column).ok().flatten()
}

/// Number of rows in a table, for `portal sources`.
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to count rows in '{}'", table))?;
    Ok(count)
}
