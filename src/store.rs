//! Durable document store.
//!
//! System of record for documents and their chunks, and the source an index
//! rebuild reads from. All writes for one ingestion (the document row, its
//! lexical-index entry, every chunk) happen inside a single transaction;
//! any failure after the document insert rolls the whole thing back,
//! leaving no partial document, no orphan chunks, and no stale lexical
//! entry.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Chunk, ContentKind, Document, DocumentOverview, SourceKind};

/// Fields of a document about to be persisted.
#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub source_kind: SourceKind,
    pub source_path: &'a str,
    pub title: &'a str,
    pub content_kind: ContentKind,
    pub full_text: &'a str,
}

/// Insert a document, its lexical-index entry, and all of its chunks
/// atomically. Returns the assigned document id.
///
/// Chunk ordinals are assigned from the slice order, zero-based.
pub async fn insert_document(
    pool: &SqlitePool,
    doc: &NewDocument<'_>,
    chunk_texts: &[String],
) -> Result<i64> {
    if doc.full_text.trim().is_empty() {
        return Err(Error::ExtractionFailed(
            "refusing to store a document with empty text".to_string(),
        ));
    }

    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO documents (source_type, source_path, title, content_type, created_at, full_text)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(doc.source_kind.as_str())
    .bind(doc.source_path)
    .bind(doc.title)
    .bind(doc.content_kind.as_str())
    .bind(now)
    .bind(doc.full_text)
    .execute(&mut *tx)
    .await?;

    let doc_id = result.last_insert_rowid();

    sqlx::query("INSERT INTO documents_fts (doc_id, title, full_text) VALUES (?, ?, ?)")
        .bind(doc_id)
        .bind(doc.title)
        .bind(doc.full_text)
        .execute(&mut *tx)
        .await?;

    for (i, text) in chunk_texts.iter().enumerate() {
        sqlx::query(
            "INSERT INTO chunks (doc_id, chunk_order, chunk_text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(doc_id)
        .bind(i as i64)
        .bind(text)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(doc_id, chunks = chunk_texts.len(), "document stored");

    Ok(doc_id)
}

/// Fetch a document by id, distinguishing a miss from a failure.
pub async fn get_document(pool: &SqlitePool, doc_id: i64) -> Result<Document> {
    let row = sqlx::query(
        "SELECT doc_id, source_type, source_path, title, content_type, created_at, full_text
         FROM documents WHERE doc_id = ?",
    )
    .bind(doc_id)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| Error::NotFound(format!("document {}", doc_id)))?;
    document_from_row(&row)
}

/// List all documents newest-first, with their chunk counts.
pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<DocumentOverview>> {
    let rows = sqlx::query(
        r#"
        SELECT d.doc_id, d.title, d.content_type, d.created_at, COUNT(c.chunk_id) AS chunk_count
        FROM documents d
        LEFT JOIN chunks c ON c.doc_id = d.doc_id
        GROUP BY d.doc_id
        ORDER BY d.created_at DESC, d.doc_id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DocumentOverview {
                doc_id: row.get("doc_id"),
                title: row.get("title"),
                content_kind: content_kind_from_row(row.get("content_type"))?,
                created_at: row.get("created_at"),
                chunk_count: row.get("chunk_count"),
            })
        })
        .collect()
}

/// Ordered chunks for one document.
pub async fn list_chunks(pool: &SqlitePool, doc_id: i64) -> Result<Vec<Chunk>> {
    let rows = sqlx::query(
        "SELECT chunk_id, doc_id, chunk_order, chunk_text, created_at
         FROM chunks WHERE doc_id = ? ORDER BY chunk_order ASC",
    )
    .bind(doc_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Chunk {
            chunk_id: row.get("chunk_id"),
            doc_id: row.get("doc_id"),
            chunk_order: row.get("chunk_order"),
            chunk_text: row.get("chunk_text"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub async fn count_documents(pool: &SqlitePool) -> Result<i64> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

pub async fn count_chunks(pool: &SqlitePool) -> Result<i64> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Append one message to the chat history.
pub async fn record_chat_message(
    pool: &SqlitePool,
    session_id: &str,
    role: &str,
    content: &str,
    sources: Option<&str>,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO chat_history (session_id, role, content, sources, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(role)
    .bind(content)
    .bind(sources)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let source_type: String = row.get("source_type");
    let source_kind = SourceKind::parse(&source_type).ok_or_else(|| {
        Error::Persistence(sqlx::Error::Decode(
            format!("unknown source_type '{}'", source_type).into(),
        ))
    })?;

    Ok(Document {
        doc_id: row.get("doc_id"),
        source_kind,
        source_path: row.get("source_path"),
        title: row.get("title"),
        content_kind: content_kind_from_row(row.get("content_type"))?,
        created_at: row.get("created_at"),
        full_text: row.get("full_text"),
    })
}

fn content_kind_from_row(value: String) -> Result<ContentKind> {
    ContentKind::parse(&value).ok_or_else(|| {
        Error::Persistence(sqlx::Error::Decode(
            format!("unknown content_type '{}'", value).into(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::run(&pool).await.unwrap();
        pool
    }

    fn sample_doc<'a>(title: &'a str, text: &'a str) -> NewDocument<'a> {
        NewDocument {
            source_kind: SourceKind::Manual,
            source_path: "manual",
            title,
            content_kind: ContentKind::Text,
            full_text: text,
        }
    }

    #[tokio::test]
    async fn insert_assigns_monotonic_ids_and_counts() {
        let pool = memory_pool().await;

        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];
        let id1 = insert_document(&pool, &sample_doc("One", "first chunk second chunk"), &chunks)
            .await
            .unwrap();
        let id2 = insert_document(&pool, &sample_doc("Two", "more text here"), &chunks)
            .await
            .unwrap();

        assert!(id2 > id1);
        assert_eq!(count_documents(&pool).await.unwrap(), 2);
        assert_eq!(count_chunks(&pool).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn chunks_come_back_in_ordinal_order() {
        let pool = memory_pool().await;

        let chunks: Vec<String> = (0..5).map(|i| format!("chunk number {}", i)).collect();
        let doc_id = insert_document(&pool, &sample_doc("Ordered", "body"), &chunks)
            .await
            .unwrap();

        let stored = list_chunks(&pool, doc_id).await.unwrap();
        assert_eq!(stored.len(), 5);
        for (i, chunk) in stored.iter().enumerate() {
            assert_eq!(chunk.chunk_order, i as i64);
            assert_eq!(chunk.chunk_text, format!("chunk number {}", i));
        }
    }

    #[tokio::test]
    async fn get_document_distinguishes_not_found() {
        let pool = memory_pool().await;

        let err = get_document(&pool, 42).await.unwrap_err();
        assert!(err.is_not_found());

        let doc_id = insert_document(&pool, &sample_doc("Here", "some body text"), &[])
            .await
            .unwrap();
        let doc = get_document(&pool, doc_id).await.unwrap();
        assert_eq!(doc.title, "Here");
        assert_eq!(doc.content_kind, ContentKind::Text);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_any_write() {
        let pool = memory_pool().await;

        let err = insert_document(&pool, &sample_doc("Empty", "   \n  "), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
        assert_eq!(count_documents(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_chunk_insert_rolls_back_whole_ingestion() {
        let pool = memory_pool().await;

        insert_document(&pool, &sample_doc("Existing", "existing body"), &["a".to_string()])
            .await
            .unwrap();

        let docs_before = count_documents(&pool).await.unwrap();
        let chunks_before = count_chunks(&pool).await.unwrap();

        // The empty chunk violates the schema CHECK after the document and
        // fts rows are already written inside the transaction.
        let result = insert_document(
            &pool,
            &sample_doc("Doomed", "doomed body"),
            &["good chunk".to_string(), String::new()],
        )
        .await;
        assert!(result.is_err());

        assert_eq!(count_documents(&pool).await.unwrap(), docs_before);
        assert_eq!(count_chunks(&pool).await.unwrap(), chunks_before);

        let fts_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents_fts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fts_count, docs_before);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let pool = memory_pool().await;

        for title in ["alpha", "beta", "gamma"] {
            insert_document(&pool, &sample_doc(title, "shared body text"), &[])
                .await
                .unwrap();
        }

        let docs = list_documents(&pool).await.unwrap();
        assert_eq!(docs.len(), 3);
        // Same created_at second is possible; doc_id desc breaks the tie.
        assert_eq!(docs[0].title, "gamma");
        assert_eq!(docs[2].title, "alpha");
    }

    #[tokio::test]
    async fn chat_messages_are_recorded() {
        let pool = memory_pool().await;

        record_chat_message(&pool, "session-1", "user", "what is prayer?", None)
            .await
            .unwrap();
        record_chat_message(&pool, "session-1", "assistant", "an answer", Some("[1,2]"))
            .await
            .unwrap();

        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_history")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(n, 2);
    }
}
