//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! Callers can tell "no such document" apart from "operation failed", and
//! "semantic index not built" apart from "no results"; those distinctions
//! drive the CLI's exit codes and messages.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transcription or text extraction yielded nothing or failed outright.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// Remote fetch failed or timed out before any persistence happened.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// File extension not recognized as audio, PDF, or plain text.
    #[error("unsupported content kind: {0}")]
    UnsupportedContentKind(String),

    /// Store write failed; the surrounding transaction rolls back.
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Vector index or metadata file is missing or out of sync. Only the
    /// semantic search mode is affected; keyword search keeps working.
    #[error("semantic index not built: {0} (run `lore index rebuild`)")]
    IndexUnavailable(String),

    /// Invalid index operation (dimension mismatch, zero k).
    #[error("invalid index operation: {0}")]
    Index(String),

    /// Embedding or answer-generation call failed, including non-success
    /// status codes. The message carries the provider's raw detail.
    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the lookup-miss case, as opposed to an operational failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
