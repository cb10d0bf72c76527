//! Sample documents for trying out the system.
//!
//! Seeds three short texts with paragraph-bounded chunks, handy for
//! exercising search and the vector index without transcribing or
//! extracting anything.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::models::{ContentKind, SourceKind};
use crate::store::{self, NewDocument};

pub const SAMPLE_DOCUMENTS: [(&str, &str); 3] = [
    (
        "Introduction to Prayer",
        "\
Prayer is a fundamental spiritual practice found in many religions and philosophies.
It serves as a means of communication with the divine, whether through spoken words,
silent thoughts, or meditative practices.

Types of prayer include:
- Petitionary prayer (asking for help)
- Intercessory prayer (praying for others)
- Thanksgiving prayer (expressing gratitude)
- Contemplative prayer (meditative connection)

Research shows that prayer can reduce stress, improve emotional wellbeing,
and foster a sense of community among practitioners.",
    ),
    (
        "Meditation and Mindfulness",
        "\
Meditation is an ancient practice that involves focusing the mind and reducing
the stream of thoughts. Mindfulness, a form of meditation, emphasizes present-moment
awareness without judgment.

Benefits of meditation include:
- Reduced anxiety and depression
- Improved focus and concentration
- Better sleep quality
- Lower blood pressure
- Enhanced emotional regulation

Different meditation techniques include:
- Breath awareness
- Body scan meditation
- Loving-kindness meditation
- Walking meditation
- Transcendental meditation

Most practitioners recommend starting with 5-10 minutes daily and gradually
increasing the duration as you become more comfortable with the practice.",
    ),
    (
        "Scripture Study Methods",
        "\
Effective scripture study requires intentional approaches and consistent practice.
Several proven methods can help readers gain deeper understanding of sacred texts.

Popular scripture study methods:

1. INDUCTIVE METHOD
- Observe: What does the text say?
- Interpret: What does it mean?
- Apply: How does it apply to my life?

2. EXPOSITORY METHOD
Focuses on thorough explanation of specific passages and their context.

3. TOPICAL METHOD
Studies specific themes or subjects across multiple passages.

4. HISTORICAL METHOD
Examines the historical context and cultural background of the text.

When studying scriptures, consider:
- Who is the author?
- Who is the intended audience?
- What is the historical context?
- What are the key themes?
- How does this apply today?

Regular scripture study deepens spiritual understanding and strengthens faith.",
    ),
];

/// Split sample text on blank lines, dropping empty paragraphs.
pub fn paragraph_chunks(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

/// Insert the sample documents through the same transactional path real
/// ingestion uses.
pub async fn seed_samples(pool: &SqlitePool) -> Result<Vec<(String, usize)>> {
    let mut added = Vec::new();

    for (title, text) in SAMPLE_DOCUMENTS {
        let chunks = paragraph_chunks(text);
        let doc = NewDocument {
            source_kind: SourceKind::Manual,
            source_path: "sample",
            title,
            content_kind: ContentKind::Text,
            full_text: text,
        };
        store::insert_document(pool, &doc, &chunks).await?;
        added.push((title.to_string(), chunks.len()));
    }

    Ok(added)
}

/// CLI entry point for `lore seed`.
pub async fn run_seed(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let added = seed_samples(&pool).await?;
    pool.close().await;

    for (title, chunk_count) in &added {
        println!("Added: {} ({} chunks)", title, chunk_count);
    }
    println!("ok");
    Ok(())
}
