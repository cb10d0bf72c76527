//! Text extraction for the supported content kinds.
//!
//! Extraction is pipeline-layer: the ingestion flow supplies a path and a
//! [`ContentKind`], this module returns plain UTF-8 text. Audio goes through
//! a Whisper-compatible HTTP transcription service; PDFs go through
//! `pdf-extract`; plain text is read as-is. Every failure here happens
//! before anything touches the database.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::ContentKind;

/// Extract the full text for a document. Errors if the result would be
/// empty: an empty extraction must never become a document row.
pub async fn extract_text(config: &Config, kind: ContentKind, path: &Path) -> Result<String> {
    let text = match kind {
        ContentKind::Audio => transcribe_audio(config, path).await?,
        ContentKind::Pdf => extract_pdf(path)?,
        ContentKind::Text => std::fs::read_to_string(path)?,
    };

    if text.trim().is_empty() {
        return Err(Error::ExtractionFailed(format!(
            "{} yielded no text",
            path.display()
        )));
    }

    Ok(text)
}

fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| Error::ExtractionFailed(format!("PDF {}: {}", path.display(), e)))?;

    if text.trim().is_empty() {
        return Err(Error::ExtractionFailed(format!(
            "PDF {} has no extractable text (may be image-based)",
            path.display()
        )));
    }

    Ok(text)
}

/// Send the audio file to the transcription service and return the
/// transcript.
///
/// Contract: `POST {url}/inference` with a multipart body (`file`,
/// `response_format=json`), response `{"text": "..."}`. This matches the
/// whisper.cpp server and compatible implementations.
async fn transcribe_audio(config: &Config, path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.mp3")
        .to_string();

    debug!(file = %file_name, bytes = bytes.len(), "transcribing audio");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.transcription.timeout_secs))
        .build()
        .map_err(|e| Error::ExtractionFailed(e.to_string()))?;

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        )
        .text("response_format", "json");

    let response = client
        .post(format!("{}/inference", config.transcription.url))
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            Error::ExtractionFailed(format!(
                "transcription service unreachable at {}: {}",
                config.transcription.url, e
            ))
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::ExtractionFailed(format!(
            "transcription service returned {}: {}",
            status, body
        )));
    }

    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| Error::ExtractionFailed(format!("invalid transcription response: {}", e)))?;

    let text = json
        .get("text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            Error::ExtractionFailed("transcription response missing 'text' field".to_string())
        })?
        .to_string();

    if text.trim().is_empty() {
        return Err(Error::ExtractionFailed(
            "transcription returned an empty transcript".to_string(),
        ));
    }

    Ok(text)
}
