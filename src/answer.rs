//! Answer generation against a chat-completion provider.
//!
//! One narrow contract: POST a single prompt containing labeled context
//! blocks and a question, receive one generated completion. Requires the
//! `OPENAI_API_KEY` environment variable, like the embedding provider.

use std::time::Duration;

use crate::config::AnswerConfig;
use crate::error::{Error, Result};

/// The fixed instruction wrapped around every question.
const INSTRUCTION: &str = "You are a helpful assistant that answers questions based on provided documents.\n\
Use the following document excerpts to answer the question. Be thorough and cite the source document.";

pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "{}\n\nDocument Context:\n{}\n\nQuestion: {}\n\nAnswer:",
        INSTRUCTION, context, question
    )
}

/// Generate an answer from the retrieved context.
///
/// Any failure (missing credential, non-2xx status, transport error) comes
/// back as [`Error::Provider`] carrying the provider's raw detail.
pub async fn generate_answer(config: &AnswerConfig, question: &str, context: &str) -> Result<String> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| Error::Provider("OPENAI_API_KEY not set".to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Provider(e.to_string()))?;

    let body = serde_json::json!({
        "model": config.model,
        "messages": [{"role": "user", "content": build_prompt(question, context)}],
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    });

    let response = client
        .post(&config.url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Provider(format!("answer request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(Error::Provider(format!(
            "answer provider returned {}: {}",
            status, body_text
        )));
    }

    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| Error::Provider(format!("invalid answer response: {}", e)))?;

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Provider("answer response missing completion text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_context_and_question() {
        let prompt = build_prompt("What is prayer?", "[From: Introduction to Prayer]\nPrayer is...");
        assert!(prompt.contains("Document Context:"));
        assert!(prompt.contains("[From: Introduction to Prayer]"));
        assert!(prompt.contains("Question: What is prayer?"));
        assert!(prompt.ends_with("Answer:"));
    }
}
