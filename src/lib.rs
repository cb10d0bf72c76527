//! # Lorebase
//!
//! A local knowledge base with transcription-aware ingestion, dual-index
//! search, and retrieval-augmented question answering.
//!
//! Lorebase ingests heterogeneous documents — audio recordings (via an
//! external transcription service), PDFs, and plain text — into SQLite,
//! maintains an exact-term FTS index and a flat vector-similarity index
//! over the same chunk set, and answers natural-language questions over
//! retrieved chunks with cited sources.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ File / URL / │──▶│  Pipeline     │──▶│    SQLite      │
//! │ Manual text  │   │ Extract+Chunk│   │ docs+chunks+FTS│
//! └──────────────┘   └──────────────┘   └───────┬───────┘
//!                                               │
//!                    ┌──────────────┐           │ (offline rebuild)
//!                    │ Vector index │◀──────────┤
//!                    │ file + meta  │           │
//!                    └──────┬───────┘           │
//!                           ▼                   ▼
//!                    ┌──────────────────────────────┐
//!                    │  search / ask (RAG)  — lore  │
//!                    └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lore init                       # create database
//! lore ingest notes.pdf           # extract, chunk, store
//! lore ingest talk.mp3            # transcribe, chunk, store
//! lore index rebuild              # embed all chunks, write index
//! lore search "deployment"        # exact-term search
//! lore ask "what was decided?"    # retrieval-augmented answer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Fixed-window text splitting |
//! | [`store`] | Transactional document/chunk store |
//! | [`extract`] | Transcription, PDF, and text extraction |
//! | [`ingest`] | Ingestion pipeline |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`vector_index`] | Flat L2 index + metadata sidecar |
//! | [`search`] | Keyword and semantic retrieval |
//! | [`ask`] | RAG orchestration |
//! | [`answer`] | Chat-completion provider client |

pub mod answer;
pub mod ask;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod get;
pub mod ingest;
pub mod list;
pub mod migrate;
pub mod models;
pub mod search;
pub mod seed;
pub mod stats;
pub mod store;
pub mod vector_index;
