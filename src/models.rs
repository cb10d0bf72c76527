//! Core data models used throughout Lorebase.
//!
//! These types represent the documents, chunks, and search results that flow
//! through the ingestion and retrieval pipeline.

use std::path::Path;

use crate::error::{Error, Result};

/// How a document entered the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Upload,
    Url,
    Manual,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Upload => "upload",
            SourceKind::Url => "url",
            SourceKind::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(SourceKind::Upload),
            "url" => Some(SourceKind::Url),
            "manual" => Some(SourceKind::Manual),
            _ => None,
        }
    }
}

/// Closed set of content kinds the pipeline knows how to extract.
///
/// Adding a new kind is a compile error in every `match` until the
/// extraction path handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Audio,
    Pdf,
    Text,
}

impl ContentKind {
    /// Detect the content kind from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" | "wav" | "m4a" => Ok(ContentKind::Audio),
            "pdf" => Ok(ContentKind::Pdf),
            "txt" | "md" | "text" => Ok(ContentKind::Text),
            _ => Err(Error::UnsupportedContentKind(path.display().to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Audio => "audio",
            ContentKind::Pdf => "pdf",
            ContentKind::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(ContentKind::Audio),
            "pdf" => Some(ContentKind::Pdf),
            "text" => Some(ContentKind::Text),
            _ => None,
        }
    }
}

/// One ingested unit, stored in SQLite.
///
/// A row exists only once its full text is known and non-empty; it is never
/// created from a partial or failed extraction, and never mutated after
/// insert.
#[derive(Debug, Clone)]
pub struct Document {
    pub doc_id: i64,
    pub source_kind: SourceKind,
    pub source_path: String,
    pub title: String,
    pub content_kind: ContentKind,
    pub created_at: i64,
    pub full_text: String,
}

/// A contiguous, possibly overlapping, substring of a document's text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_id: i64,
    pub doc_id: i64,
    pub chunk_order: i64,
    pub chunk_text: String,
    pub created_at: i64,
}

/// Summary row for document listings (no full text).
#[derive(Debug, Clone)]
pub struct DocumentOverview {
    pub doc_id: i64,
    pub title: String,
    pub content_kind: ContentKind,
    pub created_at: i64,
    pub chunk_count: i64,
}

/// A query-scoped search hit. Never persisted.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc_id: i64,
    pub title: String,
    pub content_kind: ContentKind,
    pub chunk_text: String,
    pub chunk_id: i64,
    /// Squared-L2 distance for semantic hits; `None` for keyword hits.
    pub distance: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn content_kind_from_known_extensions() {
        assert_eq!(
            ContentKind::from_path(&PathBuf::from("sermon.mp3")).unwrap(),
            ContentKind::Audio
        );
        assert_eq!(
            ContentKind::from_path(&PathBuf::from("notes.PDF")).unwrap(),
            ContentKind::Pdf
        );
        assert_eq!(
            ContentKind::from_path(&PathBuf::from("readme.md")).unwrap(),
            ContentKind::Text
        );
    }

    #[test]
    fn content_kind_rejects_unknown_extension() {
        let err = ContentKind::from_path(&PathBuf::from("image.png")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedContentKind(_)));
    }

    #[test]
    fn content_kind_rejects_missing_extension() {
        assert!(ContentKind::from_path(&PathBuf::from("noext")).is_err());
    }

    #[test]
    fn source_kind_roundtrip() {
        for kind in [SourceKind::Upload, SourceKind::Url, SourceKind::Manual] {
            assert_eq!(SourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::parse("ftp"), None);
    }
}
