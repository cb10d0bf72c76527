//! # Lorebase CLI (`lore`)
//!
//! The `lore` binary is the primary interface for Lorebase. It provides
//! commands for database initialization, document ingestion, vector-index
//! rebuilds, search, and retrieval-augmented question answering.
//!
//! ## Usage
//!
//! ```bash
//! lore --config ./config/lore.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lore init` | Create the SQLite database and run schema migrations |
//! | `lore ingest <source>` | Ingest a local file, URL, or literal text |
//! | `lore index rebuild` | Re-embed every chunk and rewrite the vector index |
//! | `lore search "<query>"` | Keyword or semantic search over chunks |
//! | `lore ask "<question>"` | Retrieve, then generate a cited answer |
//! | `lore get <id>` | Print a document and its chunks |
//! | `lore list` | List documents, newest first |
//! | `lore stats` | Document/chunk counts and index status |
//! | `lore seed` | Insert three sample documents |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! lore init --config ./config/lore.toml
//!
//! # Ingest a recording for transcription
//! lore ingest data/uploads/sermon.mp3 --title "Sunday Sermon"
//!
//! # Ingest a remote recording
//! lore ingest https://example.com/talk.mp3 --type url
//!
//! # Rebuild the vector index after ingesting
//! lore index rebuild
//!
//! # Ask a question over everything ingested
//! lore ask "what does the sermon say about gratitude?" --mode semantic
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lorebase::{ask, config, get, ingest, list, migrate, search, seed, stats, vector_index};

/// Lorebase CLI — a local knowledge base with transcription-aware
/// ingestion and RAG question answering.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lore.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lore",
    about = "Lorebase — a local knowledge base with transcription-aware ingestion and RAG question answering",
    version,
    long_about = "Lorebase ingests audio recordings (via an external transcription service), \
    PDFs, and plain text into a searchable SQLite knowledge base, maintains exact-term and \
    vector-similarity indexes over the same chunks, and answers questions over retrieved \
    chunks with cited sources."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lore.toml`. Database, storage, chunking,
    /// index, and provider settings are all read from this file.
    #[arg(long, global = true, default_value = "./config/lore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks, documents_fts, chat_history). This command is
    /// idempotent — running it multiple times is safe.
    Init,

    /// Ingest a document into the knowledge base.
    ///
    /// Accepts a local file path (`--type upload`, the default), a URL to
    /// download first (`--type url`), or literal text (`--type manual`).
    /// Audio is transcribed, PDFs have their text extracted, plain text is
    /// stored as-is. The document, its search-index entry, and all of its
    /// chunks are written in one transaction — the command succeeds only
    /// if everything committed.
    Ingest {
        /// File path, URL, or literal text depending on `--type`.
        source: String,

        /// Title for the document. Defaults to the file stem.
        #[arg(long)]
        title: Option<String>,

        /// Source type: `upload`, `url`, or `manual`.
        #[arg(long = "type", default_value = "upload")]
        source_type: String,
    },

    /// Manage the vector-similarity index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Search indexed chunks.
    ///
    /// `keyword` mode matches exact terms via the full-text index;
    /// `semantic` mode embeds the query and searches the vector index.
    /// The two modes are independent; results are never merged.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `keyword` (FTS5) or `semantic` (vector index).
        #[arg(long, default_value = "keyword")]
        mode: String,

        /// Maximum number of results (clamped to 1..=50).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Ask a question and get a cited answer.
    ///
    /// Retrieves relevant chunks, assembles them into a labeled context
    /// block, and asks the configured answer provider. With no relevant
    /// documents the provider is never called.
    Ask {
        /// The question to answer.
        question: String,

        /// Retrieval mode: `semantic` (default) or `keyword`.
        #[arg(long, default_value = "semantic")]
        mode: String,

        /// Number of chunks to retrieve for context.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print a document and its chunks by id.
    Get {
        /// Document id.
        id: i64,
    },

    /// List documents, newest first.
    List,

    /// Show document/chunk counts and vector-index status.
    Stats,

    /// Insert three sample documents for trying out search and RAG.
    Seed,
}

/// Vector-index subcommands.
#[derive(Subcommand)]
enum IndexAction {
    /// Re-embed every chunk and rewrite the index and metadata files.
    ///
    /// The rebuild replaces both files wholesale; there is no incremental
    /// update. Run it after ingesting (and with no ingest in flight).
    /// Fails if no chunks exist or the embedding provider is disabled.
    Rebuild,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            source,
            title,
            source_type,
        } => {
            ingest::run_ingest(&cfg, &source, &source_type, title).await?;
        }
        Commands::Index { action } => match action {
            IndexAction::Rebuild => {
                vector_index::run_rebuild(&cfg).await?;
            }
        },
        Commands::Search { query, mode, limit } => {
            search::run_search(&cfg, &query, &mode, limit).await?;
        }
        Commands::Ask {
            question,
            mode,
            top_k,
        } => {
            ask::run_ask(&cfg, &question, &mode, top_k).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, id).await?;
        }
        Commands::List => {
            list::run_list(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Seed => {
            seed::run_seed(&cfg).await?;
        }
    }

    Ok(())
}
