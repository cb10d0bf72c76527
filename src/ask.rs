//! Query-time orchestration: retrieve, assemble context, generate, cite.
//!
//! Each question runs a small state machine: retrieve via exactly one of
//! the two search paths; with zero hits, finish early without calling the
//! answer provider; otherwise generate an answer over the labeled context
//! and return it with the full result list so sources can be rendered.
//! A provider failure during generation is surfaced verbatim as the answer
//! text rather than thrown: the detail (missing credential, rate limit)
//! is actionable for the operator.

use anyhow::bail;
use sqlx::SqlitePool;
use tracing::debug;

use crate::answer;
use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::models::SearchResult;
use crate::search::{self, SearchMode};
use crate::store;

/// Terminal states of one question.
#[derive(Debug)]
pub enum AskOutcome {
    /// Retrieval found nothing; the provider was never called.
    NoSources,
    Answered {
        answer: String,
        sources: Vec<SearchResult>,
    },
}

/// Format retrieved chunks as a labeled context block.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("[From: {}]\n{}", r.title, r.chunk_text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Answer a question over the knowledge base.
pub async fn ask(
    config: &Config,
    pool: &SqlitePool,
    question: &str,
    mode: SearchMode,
    top_k: usize,
) -> Result<AskOutcome> {
    let sources = match mode {
        SearchMode::Keyword => search::keyword_search(pool, question, top_k as i64).await?,
        SearchMode::Semantic => search::semantic_search(config, pool, question, top_k).await?,
    };

    if sources.is_empty() {
        return Ok(AskOutcome::NoSources);
    }
    debug!(sources = sources.len(), "context assembled");

    let context = build_context(&sources);
    let answer_text = match answer::generate_answer(&config.answer, question, &context).await {
        Ok(text) => text,
        Err(Error::Provider(detail)) => detail,
        Err(e) => return Err(e),
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let doc_ids: Vec<i64> = sources.iter().map(|s| s.doc_id).collect();
    let sources_json =
        serde_json::to_string(&doc_ids).unwrap_or_else(|_| "[]".to_string());

    store::record_chat_message(pool, &session_id, "user", question, None).await?;
    store::record_chat_message(pool, &session_id, "assistant", &answer_text, Some(&sources_json))
        .await?;

    Ok(AskOutcome::Answered {
        answer: answer_text,
        sources,
    })
}

/// CLI entry point for `lore ask`.
pub async fn run_ask(
    config: &Config,
    question: &str,
    mode: &str,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    let Some(mode) = SearchMode::parse(mode) else {
        bail!("Unknown search mode: {}. Use keyword or semantic.", mode);
    };
    let top_k = top_k.unwrap_or(config.retrieval.top_k).clamp(1, 50);

    let pool = db::connect(config).await?;
    let outcome = match ask(config, &pool, question, mode, top_k).await {
        Ok(outcome) => outcome,
        Err(e) => {
            pool.close().await;
            return Err(e.into());
        }
    };
    pool.close().await;

    match outcome {
        AskOutcome::NoSources => {
            println!("No relevant documents found.");
        }
        AskOutcome::Answered { answer, sources } => {
            println!("--- Answer ---");
            println!("{}", answer);
            println!();
            println!("--- Sources ({}) ---", sources.len());
            for (i, source) in sources.iter().enumerate() {
                println!(
                    "{}. {} ({}) [doc {} chunk {}]",
                    i + 1,
                    source.title,
                    source.content_kind.as_str(),
                    source.doc_id,
                    source.chunk_id
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;

    fn result(title: &str, chunk: &str) -> SearchResult {
        SearchResult {
            doc_id: 1,
            title: title.to_string(),
            content_kind: ContentKind::Text,
            chunk_text: chunk.to_string(),
            chunk_id: 1,
            distance: None,
        }
    }

    #[test]
    fn context_blocks_are_labeled_with_titles() {
        let results = vec![
            result("Introduction to Prayer", "Prayer is a practice."),
            result("Meditation and Mindfulness", "Meditation focuses the mind."),
        ];
        let context = build_context(&results);
        assert_eq!(
            context,
            "[From: Introduction to Prayer]\nPrayer is a practice.\n\n\
             [From: Meditation and Mindfulness]\nMeditation focuses the mind."
        );
    }

    #[test]
    fn empty_results_give_empty_context() {
        assert_eq!(build_context(&[]), "");
    }

    mod with_store {
        use super::super::*;
        use crate::migrate;
        use crate::models::{ContentKind, SourceKind};
        use crate::store::NewDocument;
        use sqlx::sqlite::SqlitePoolOptions;
        use tempfile::TempDir;

        fn test_config(tmp: &TempDir) -> Config {
            Config {
                db: crate::config::DbConfig {
                    path: tmp.path().join("db.sqlite"),
                },
                storage: Default::default(),
                chunking: Default::default(),
                index: crate::config::IndexConfig {
                    index_path: tmp.path().join("chunks.lbvx"),
                    meta_path: tmp.path().join("chunks.meta.json"),
                },
                embedding: Default::default(),
                transcription: Default::default(),
                answer: Default::default(),
                retrieval: Default::default(),
            }
        }

        #[tokio::test]
        async fn zero_hits_skip_the_provider_entirely() {
            let tmp = TempDir::new().unwrap();
            let config = test_config(&tmp);

            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            migrate::run(&pool).await.unwrap();

            crate::store::insert_document(
                &pool,
                &NewDocument {
                    source_kind: SourceKind::Manual,
                    source_path: "manual",
                    title: "Unrelated",
                    content_kind: ContentKind::Text,
                    full_text: "nothing matching here at all",
                },
                &["nothing matching here at all".to_string()],
            )
            .await
            .unwrap();

            // No OPENAI_API_KEY is needed: with zero hits the provider is
            // never contacted, so this must succeed offline.
            let outcome = ask(&config, &pool, "zyzzogeton", SearchMode::Keyword, 5)
                .await
                .unwrap();
            assert!(matches!(outcome, AskOutcome::NoSources));

            let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_history")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(history, 0);
        }

        #[tokio::test]
        async fn semantic_mode_without_index_reports_unavailable() {
            let tmp = TempDir::new().unwrap();
            let config = test_config(&tmp);

            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            migrate::run(&pool).await.unwrap();

            let err = ask(&config, &pool, "anything", SearchMode::Semantic, 5)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::IndexUnavailable(_)));
        }
    }
}
