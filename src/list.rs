//! Document listing, newest first.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store;

/// CLI entry point for `lore list`.
pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let docs = store::list_documents(&pool).await?;
    pool.close().await;

    if docs.is_empty() {
        println!("No documents yet. Try: lore ingest <file.mp3|file.pdf|file.txt>");
        return Ok(());
    }

    for doc in &docs {
        let date = chrono::DateTime::from_timestamp(doc.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{}. {} ({}) - {} chunks, added {}",
            doc.doc_id,
            doc.title,
            doc.content_kind.as_str(),
            doc.chunk_count,
            date
        );
    }

    Ok(())
}
