//! Document retrieval by ID.
//!
//! Fetches a full document and its chunks for display. A missing id is a
//! lookup miss, reported as such with a nonzero exit.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store;

/// CLI entry point for `lore get`.
pub async fn run_get(config: &Config, doc_id: i64) -> Result<()> {
    let pool = db::connect(config).await?;

    let doc = match store::get_document(&pool, doc_id).await {
        Ok(doc) => doc,
        Err(e) => {
            pool.close().await;
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let chunks = store::list_chunks(&pool, doc_id).await?;
    pool.close().await;

    println!("--- Document ---");
    println!("id:           {}", doc.doc_id);
    println!("title:        {}", doc.title);
    println!("source:       {} ({})", doc.source_path, doc.source_kind.as_str());
    println!("content kind: {}", doc.content_kind.as_str());
    println!("created:      {}", format_ts_iso(doc.created_at));
    println!();

    println!("--- Full Text ---");
    println!("{}", doc.full_text);
    println!();

    println!("--- Chunks ({}) ---", chunks.len());
    for chunk in &chunks {
        println!("[chunk {} (id {})]", chunk.chunk_order, chunk.chunk_id);
        println!("{}", chunk.chunk_text);
        println!();
    }

    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
