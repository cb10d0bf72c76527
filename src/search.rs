//! Keyword and semantic retrieval.
//!
//! Two independent paths over the same chunk set: exact-term matching via
//! the FTS5 projection, and nearest-neighbor lookup via the vector index.
//! They are never fused; a query runs through exactly one of them.

use anyhow::bail;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::error::{Error, Result};
use crate::models::{ContentKind, SearchResult};
use crate::vector_index;

/// Which retrieval path a query takes. Selected per query; never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Keyword,
    Semantic,
}

impl SearchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "keyword" => Some(SearchMode::Keyword),
            "semantic" => Some(SearchMode::Semantic),
            _ => None,
        }
    }
}

/// Callers must keep `limit` within this range; the search functions assume
/// it has already been clamped.
pub const LIMIT_RANGE: (i64, i64) = (1, 50);

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(LIMIT_RANGE.0, LIMIT_RANGE.1)
}

/// Exact-term search against the (title, full_text) projection, joined back
/// to the owning document's chunks for a representative snippet. Ranking is
/// whatever FTS5 returns; duplicate (document, chunk) pairs are suppressed.
pub async fn keyword_search(
    pool: &SqlitePool,
    query: &str,
    limit: i64,
) -> Result<Vec<SearchResult>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT d.doc_id, d.title, d.content_type, c.chunk_text, c.chunk_id
        FROM documents_fts f
        JOIN documents d ON d.doc_id = f.doc_id
        JOIN chunks c ON c.doc_id = d.doc_id
        WHERE documents_fts MATCH ?
        ORDER BY c.chunk_id
        LIMIT ?
        "#,
    )
    .bind(query)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let results = rows
        .iter()
        .map(|row| {
            let content_type: String = row.get("content_type");
            SearchResult {
                doc_id: row.get("doc_id"),
                title: row.get("title"),
                content_kind: ContentKind::parse(&content_type).unwrap_or(ContentKind::Text),
                chunk_text: row.get("chunk_text"),
                chunk_id: row.get("chunk_id"),
                distance: None,
            }
        })
        .collect();

    Ok(results)
}

/// Nearest-neighbor search over the vector index, mapped back to chunks
/// through the metadata file and the store.
///
/// Fails with [`Error::IndexUnavailable`] when the index pair is absent or
/// out of sync, a condition the caller must report distinctly from "no
/// results". Chunks deleted since the last rebuild are skipped.
pub async fn semantic_search(
    config: &Config,
    pool: &SqlitePool,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchResult>> {
    let (index, meta) = vector_index::load_pair(config)?;
    let query_vec = embedding::embed_query(&config.embedding, query).await?;

    let hits = index.search(&query_vec, top_k)?;
    debug!(hits = hits.len(), "semantic candidates");

    let mut results = Vec::with_capacity(hits.len());
    for (position, distance) in hits {
        let entry = &meta[position];

        let row = sqlx::query(
            r#"
            SELECT c.chunk_text, d.content_type
            FROM chunks c
            JOIN documents d ON d.doc_id = c.doc_id
            WHERE c.chunk_id = ?
            "#,
        )
        .bind(entry.chunk_id)
        .fetch_optional(pool)
        .await?;

        // A missing row means the chunk was deleted after the last rebuild;
        // its vector is stale until the next one.
        let Some(row) = row else {
            continue;
        };

        let content_type: String = row.get("content_type");
        results.push(SearchResult {
            doc_id: entry.doc_id,
            title: entry.title.clone(),
            content_kind: ContentKind::parse(&content_type).unwrap_or(ContentKind::Text),
            chunk_text: row.get("chunk_text"),
            chunk_id: entry.chunk_id,
            distance: Some(distance),
        });
    }

    Ok(results)
}

/// CLI entry point for `lore search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    mode: &str,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let Some(mode) = SearchMode::parse(mode) else {
        bail!("Unknown search mode: {}. Use keyword or semantic.", mode);
    };

    let limit = clamp_limit(limit.unwrap_or(config.retrieval.search_limit));
    let pool = db::connect(config).await?;

    let results = match mode {
        SearchMode::Keyword => keyword_search(&pool, query, limit).await?,
        SearchMode::Semantic => {
            match semantic_search(config, &pool, query, limit as usize).await {
                Ok(results) => results,
                Err(err @ Error::IndexUnavailable(_)) => {
                    pool.close().await;
                    bail!("{}", err);
                }
                Err(e) => {
                    pool.close().await;
                    return Err(e.into());
                }
            }
        }
    };

    pool.close().await;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        match result.distance {
            Some(distance) => println!(
                "{}. [{:.4}] {} ({})",
                i + 1,
                distance,
                result.title,
                result.content_kind.as_str()
            ),
            None => println!(
                "{}. {} ({})",
                i + 1,
                result.title,
                result.content_kind.as_str()
            ),
        }
        println!("    doc: {}  chunk: {}", result.doc_id, result.chunk_id);
        println!("    excerpt: \"{}\"", excerpt(&result.chunk_text, 160));
        println!();
    }

    Ok(())
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= max_chars {
        flat.to_string()
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
