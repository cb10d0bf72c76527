//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — returns errors; used when embeddings are not configured.
//! - **[`OpenAIProvider`]** — calls the OpenAI embeddings API with retry and backoff.
//! - **[`OllamaProvider`]** — calls a local Ollama instance's `/api/embed` endpoint.
//!
//! The contract every backend upholds: one vector per input string, in the
//! same order as the input, with a fixed dimensionality per provider
//! instance. Batching is the caller's responsibility; callers that split a
//! large input into batches must concatenate results in input order, since
//! vector-index ordinal alignment depends on it. An index's vectors must
//! all come from one provider and one dimensionality; mixing providers
//! within an index makes distances meaningless.
//!
//! # Retry Strategy
//!
//! The HTTP providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Trait for embedding providers.
///
/// Carries provider metadata; the embedding computation itself lives in
/// [`embed_texts`] (kept as a free function due to async trait limitations).
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
}

/// Embed a batch of texts using the configured provider.
///
/// Returns one embedding vector per input text, in input order.
pub async fn embed_texts(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    match config.provider.as_str() {
        "openai" => embed_openai(config, texts).await,
        "ollama" => embed_ollama(config, texts).await,
        "disabled" => Err(Error::Provider(
            "embedding provider is disabled; set [embedding] provider in config".to_string(),
        )),
        other => Err(Error::Provider(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

/// Embed a single query text.
///
/// Convenience wrapper around [`embed_texts`] for search-time use.
pub async fn embed_query(config: &EmbeddingConfig, text: &str) -> Result<Vec<f32>> {
    let results = embed_texts(config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| Error::Provider("empty embedding response".to_string()))
}

pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        other => Err(Error::Provider(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIProvider {
    model: String,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Provider("embedding.model required for OpenAI".to_string()))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(Error::Provider(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }

        Ok(Self { model })
    }
}

impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
}

async fn embed_openai(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| Error::Provider("OPENAI_API_KEY not set".to_string()))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| Error::Provider("embedding.model required".to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Provider(e.to_string()))?;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| Error::Provider(e.to_string()))?;
                    let embeddings = parse_openai_response(&json)?;
                    check_batch_shape(&embeddings, texts.len())?;
                    return Ok(embeddings);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(Error::Provider(format!(
                        "OpenAI API error {}: {}",
                        status, body_text
                    )));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                return Err(Error::Provider(format!(
                    "OpenAI API error {}: {}",
                    status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(Error::Provider(e.to_string()));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Error::Provider("embedding failed after retries".to_string())))
}

/// Parse the OpenAI embeddings API response JSON.
///
/// The `data` array is ordered by `index`; entries are re-sorted on that
/// field so the output always matches input order.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::Provider("invalid OpenAI response: missing data array".to_string()))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                Error::Provider("invalid OpenAI response: missing embedding".to_string())
            })?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);

        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). Requires Ollama to be running with an
/// embedding model pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    model: String,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Provider("embedding.model required for Ollama".to_string()))?;

        Ok(Self { model })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
}

async fn embed_ollama(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| Error::Provider("embedding.model required".to_string()))?;

    let url = config.url.as_deref().unwrap_or("http://localhost:11434");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Provider(e.to_string()))?;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{}/api/embed", url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| Error::Provider(e.to_string()))?;
                    let embeddings = parse_ollama_response(&json)?;
                    check_batch_shape(&embeddings, texts.len())?;
                    return Ok(embeddings);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(Error::Provider(format!(
                        "Ollama API error {}: {}",
                        status, body_text
                    )));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                return Err(Error::Provider(format!(
                    "Ollama API error {}: {}",
                    status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(Error::Provider(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    url, e
                )));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| Error::Provider("Ollama embedding failed after retries".to_string())))
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            Error::Provider("invalid Ollama response: missing embeddings array".to_string())
        })?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                Error::Provider("invalid Ollama response: embedding is not an array".to_string())
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

/// Reject responses that break the one-vector-per-input contract.
fn check_batch_shape(embeddings: &[Vec<f32>], expected: usize) -> Result<()> {
    if embeddings.len() != expected {
        return Err(Error::Provider(format!(
            "provider returned {} vectors for {} inputs",
            embeddings.len(),
            expected
        )));
    }
    if let Some(first) = embeddings.first() {
        if first.is_empty() {
            return Err(Error::Provider("provider returned empty vectors".to_string()));
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != first.len()) {
            return Err(Error::Provider(format!(
                "provider returned mixed dimensionality ({} vs {})",
                first.len(),
                bad.len()
            )));
        }
    }
    debug!(count = embeddings.len(), "embedding batch ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_response_reordered_by_index() {
        let json = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [2.0, 2.0]},
                {"index": 0, "embedding": [1.0, 1.0]},
                {"index": 2, "embedding": [3.0, 3.0]},
            ]
        });
        let embeddings = parse_openai_response(&json).unwrap();
        assert_eq!(embeddings[0], vec![1.0, 1.0]);
        assert_eq!(embeddings[1], vec![2.0, 2.0]);
        assert_eq!(embeddings[2], vec![3.0, 3.0]);
    }

    #[test]
    fn openai_response_missing_data_errors() {
        let json = serde_json::json!({"object": "list"});
        assert!(parse_openai_response(&json).is_err());
    }

    #[test]
    fn ollama_response_parsed_in_order() {
        let json = serde_json::json!({
            "embeddings": [[0.1, 0.2], [0.3, 0.4]]
        });
        let embeddings = parse_ollama_response(&json).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[1], vec![0.3, 0.4]);
    }

    #[test]
    fn batch_shape_mismatch_detected() {
        let err = check_batch_shape(&[vec![1.0]], 2).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        let err = check_batch_shape(&[vec![1.0, 2.0], vec![1.0]], 2).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        assert!(check_batch_shape(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2).is_ok());
    }

    #[tokio::test]
    async fn disabled_provider_refuses_to_embed() {
        let config = EmbeddingConfig::default();
        let err = embed_texts(&config, &["hello".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
