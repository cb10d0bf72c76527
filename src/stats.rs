//! Knowledge-base statistics and health overview.
//!
//! Quick summary of what's stored and indexed: document count, chunk count,
//! database size, vector-index status, and a per-content-kind breakdown.
//! Gives confidence that ingests and rebuilds are working as expected.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::error::Error;
use crate::store;
use crate::vector_index;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_docs = store::count_documents(&pool).await?;
    let total_chunks = store::count_chunks(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    let index_status = match vector_index::load_pair(config) {
        Ok((index, _)) => format!("{} vectors ({} dims)", index.len(), index.dims()),
        Err(Error::IndexUnavailable(_)) => "not built (run `lore index rebuild`)".to_string(),
        Err(e) => format!("error: {}", e),
    };

    println!("Lorebase — Knowledge Base Stats");
    println!("===============================");
    println!();
    println!("  Database:     {}", config.db.path.display());
    println!("  Size:         {}", format_bytes(db_size));
    println!();
    println!("  Documents:    {}", total_docs);
    println!("  Chunks:       {}", total_chunks);
    println!("  Vector index: {}", index_status);

    // Per-content-kind breakdown
    let kind_rows = sqlx::query(
        r#"
        SELECT
            d.content_type,
            COUNT(DISTINCT d.doc_id) AS doc_count,
            COUNT(c.chunk_id) AS chunk_count
        FROM documents d
        LEFT JOIN chunks c ON c.doc_id = d.doc_id
        GROUP BY d.content_type
        ORDER BY doc_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !kind_rows.is_empty() {
        println!();
        println!("  By content kind:");
        println!("  {:<10} {:>6} {:>8}", "KIND", "DOCS", "CHUNKS");
        println!("  {}", "-".repeat(26));
        for row in &kind_rows {
            let kind: String = row.get("content_type");
            let doc_count: i64 = row.get("doc_count");
            let chunk_count: i64 = row.get("chunk_count");
            println!("  {:<10} {:>6} {:>8}", kind, doc_count, chunk_count);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
