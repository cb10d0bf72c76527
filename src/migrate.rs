use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the schema if it does not exist. Safe to call repeatedly.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    // Documents table - one row per ingested unit, immutable after insert
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_type TEXT NOT NULL,
            source_path TEXT NOT NULL,
            title TEXT NOT NULL,
            content_type TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            full_text TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chunks table - ordered segments of a document's text
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            chunk_id INTEGER PRIMARY KEY AUTOINCREMENT,
            doc_id INTEGER NOT NULL,
            chunk_order INTEGER NOT NULL,
            chunk_text TEXT NOT NULL CHECK(chunk_text <> ''),
            created_at INTEGER NOT NULL,
            UNIQUE(doc_id, chunk_order),
            FOREIGN KEY (doc_id) REFERENCES documents(doc_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chat history - persisted by the ask flow, not read by retrieval
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_history (
            message_id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            sources TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 virtual table over the (title, full_text) projection.
    // FTS5 CREATE is not idempotent natively, so we check first.
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='documents_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE documents_fts USING fts5(
                doc_id UNINDEXED,
                title,
                full_text
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_history_session ON chat_history(session_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// CLI entry point for `lore init`.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    run(&pool).await?;
    pool.close().await;
    Ok(())
}
