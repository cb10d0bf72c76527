//! Ingestion pipeline orchestration.
//!
//! Coordinates the full ingest flow for one document: source resolution
//! (local file, URL download, or literal text) → extraction/transcription →
//! chunking → a single atomic store write. Extraction and download failures
//! abort before anything is persisted; a store failure rolls back the whole
//! transaction. Either way no partial document is ever visible.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::chunk;
use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::extract;
use crate::models::{ContentKind, SourceKind};
use crate::store::{self, NewDocument};

/// Outcome of one successful ingestion.
#[derive(Debug)]
pub struct IngestReport {
    pub doc_id: i64,
    pub title: String,
    pub content_kind: ContentKind,
    pub chunk_count: usize,
}

/// Ingest one source into the knowledge base.
///
/// Blocking from the caller's perspective: extraction, persistence, and the
/// lexical-index update all run to completion (or roll back) before this
/// returns.
pub async fn ingest_source(
    config: &Config,
    pool: &SqlitePool,
    source: &str,
    source_kind: SourceKind,
    title: Option<String>,
) -> Result<IngestReport> {
    std::fs::create_dir_all(&config.storage.uploads_dir)?;
    std::fs::create_dir_all(&config.storage.transcripts_dir)?;

    let (full_text, content_kind, source_path, title) = match source_kind {
        SourceKind::Manual => {
            let title = title.unwrap_or_else(|| "untitled note".to_string());
            (source.to_string(), ContentKind::Text, "manual".to_string(), title)
        }
        SourceKind::Url => {
            let local = fetch_url(config, source).await?;
            let kind = ContentKind::from_path(&local)?;
            let title = title.unwrap_or_else(|| stem_title(&local));
            let text = extract_with_sidecar(config, kind, &local, &title, source).await?;
            (text, kind, source.to_string(), title)
        }
        SourceKind::Upload => {
            let path = PathBuf::from(source);
            if !path.exists() {
                return Err(Error::NotFound(format!("file {}", path.display())));
            }
            let kind = ContentKind::from_path(&path)?;
            let title = title.unwrap_or_else(|| stem_title(&path));
            let text = extract_with_sidecar(config, kind, &path, &title, source).await?;
            (text, kind, source.to_string(), title)
        }
    };

    if full_text.trim().is_empty() {
        return Err(Error::ExtractionFailed(format!(
            "{} produced no text",
            source
        )));
    }

    let chunks = chunk::split(
        &full_text,
        config.chunking.window_size,
        config.chunking.overlap,
    );
    debug!(chunks = chunks.len(), "text chunked");

    let doc = NewDocument {
        source_kind,
        source_path: &source_path,
        title: &title,
        content_kind,
        full_text: &full_text,
    };
    let doc_id = store::insert_document(pool, &doc, &chunks).await?;

    info!(doc_id, title = %title, "ingested");

    Ok(IngestReport {
        doc_id,
        title,
        content_kind,
        chunk_count: chunks.len(),
    })
}

/// Extract text, and for audio also write the transcript sidecar JSON.
async fn extract_with_sidecar(
    config: &Config,
    kind: ContentKind,
    path: &Path,
    title: &str,
    source: &str,
) -> Result<String> {
    let text = extract::extract_text(config, kind, path).await?;

    if kind == ContentKind::Audio {
        let sidecar = config
            .storage
            .transcripts_dir
            .join(format!("{}.json", title));
        let payload = serde_json::json!({
            "title": title,
            "source": source,
            "transcript": text,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        std::fs::write(&sidecar, serde_json::to_string_pretty(&payload).unwrap_or_default())?;
        debug!(path = %sidecar.display(), "transcript saved");
    }

    Ok(text)
}

/// Download a remote file into the uploads directory and return its path.
async fn fetch_url(config: &Config, url: &str) -> Result<PathBuf> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| Error::DownloadFailed(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::DownloadFailed(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::DownloadFailed(format!("{} returned {}", url, status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::DownloadFailed(format!("{}: {}", url, e)))?;

    let file_name = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains('?'))
        .unwrap_or("downloaded_file");
    let dest = config.storage.uploads_dir.join(file_name);
    std::fs::write(&dest, &bytes)?;

    info!(url, dest = %dest.display(), bytes = bytes.len(), "downloaded");
    Ok(dest)
}

fn stem_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

/// CLI entry point for `lore ingest`.
pub async fn run_ingest(
    config: &Config,
    source: &str,
    source_type: &str,
    title: Option<String>,
) -> anyhow::Result<()> {
    let Some(source_kind) = SourceKind::parse(source_type) else {
        anyhow::bail!(
            "Unknown source type: {}. Use upload, url, or manual.",
            source_type
        );
    };

    let pool = db::connect(config).await?;
    let report = match ingest_source(config, &pool, source, source_kind, title).await {
        Ok(report) => report,
        Err(e) => {
            pool.close().await;
            return Err(e.into());
        }
    };
    pool.close().await;

    println!("ingest {}", source);
    println!("  document id: {}", report.doc_id);
    println!("  title: {}", report.title);
    println!("  content kind: {}", report.content_kind.as_str());
    println!("  chunks written: {}", report.chunk_count);
    println!("ok");
    Ok(())
}
