use anyhow::Result;

use crate::config::Config;
use crate::content::count_rows;
use crate::db;

/// Print every configured content source with its row count, and whether
/// the table could be read.
pub async fn list_sources(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    println!("{:<20} {:<10} {:<8} COLUMNS", "TABLE", "ROWS", "HEALTHY");
    for source in &config.sync.sources {
        let (rows, healthy) = match count_rows(&pool, &source.table).await {
            Ok(n) => (n.to_string(), true),
            Err(e) => {
                tracing::warn!(table = %source.table, "{:#}", e);
                ("-".to_string(), false)
            }
        };
        println!(
            "{:<20} {:<10} {:<8} {}",
            source.table,
            rows,
            healthy,
            source.columns.join(", ")
        );
    }

    pool.close().await;
    Ok(())
}
