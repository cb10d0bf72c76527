use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default = "default_transcripts_dir")]
    pub transcripts_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            transcripts_dir: default_transcripts_dir(),
        }
    }
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}
fn default_transcripts_dir() -> PathBuf {
    PathBuf::from("data/transcripts")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_window_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

/// Paths of the derived vector-index artifacts. The index file and the
/// metadata file are only valid as a pair; both are rewritten together on
/// every rebuild.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub index_path: PathBuf,
    pub meta_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    10
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// Whisper-compatible HTTP transcription service.
#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_url")]
    pub url: String,
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            url: default_transcription_url(),
            timeout_secs: default_transcription_timeout_secs(),
        }
    }
}

fn default_transcription_url() -> String {
    "http://localhost:9000".to_string()
}
fn default_transcription_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_answer_url")]
    pub url: String,
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            url: default_answer_url(),
            model: default_answer_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_answer_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_answer_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    1200
}
fn default_temperature() -> f64 {
    0.7
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_search_limit")]
    pub search_limit: i64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            top_k: default_top_k(),
        }
    }
}

fn default_search_limit() -> i64 {
    10
}
fn default_top_k() -> usize {
    5
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.window_size == 0 {
        anyhow::bail!("chunking.window_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.window_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.window_size");
    }

    if config.retrieval.search_limit < 1 {
        anyhow::bail!("retrieval.search_limit must be >= 1");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_toml() -> String {
        r#"
[db]
path = "data/lore.sqlite"

[index]
index_path = "data/chunks.lbvx"
meta_path = "data/chunks.meta.json"
"#
        .to_string()
    }

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: Config = toml::from_str(&base_toml()).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.chunking.window_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let toml_str = format!(
            "{}\n[chunking]\nwindow_size = 100\noverlap = 100\n",
            base_toml()
        );
        let config: Config = toml::from_str(&toml_str).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn enabled_embedding_requires_model() {
        let toml_str = format!("{}\n[embedding]\nprovider = \"openai\"\n", base_toml());
        let config: Config = toml::from_str(&toml_str).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_embedding_provider_rejected() {
        let toml_str = format!(
            "{}\n[embedding]\nprovider = \"bespoke\"\nmodel = \"m\"\n",
            base_toml()
        );
        let config: Config = toml::from_str(&toml_str).unwrap();
        assert!(validate(&config).is_err());
    }
}
