//! Flat vector-similarity index with file persistence.
//!
//! The index is a dense array of fixed-dimension f32 vectors searched by
//! squared-Euclidean distance with a full scan, rebuilt wholesale from the
//! document store; there is no incremental add, update, or delete. The
//! index file stores only vectors at positions; identity lives in a
//! companion metadata file whose i-th entry describes the chunk embedded
//! at position i. That ordinal alignment is a structural requirement: the
//! two files are only valid as a pair, regenerated together, and a length
//! mismatch between them means the pair is corrupt.
//!
//! Rebuilding while an ingest is in flight is undefined; quiesce writes
//! first.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::config::Config;
use crate::embedding;
use crate::error::{Error, Result};

/// Index file magic + format version.
const MAGIC: &[u8; 4] = b"LBVX";
const VERSION: u32 = 1;

/// Identity record for the vector stored at the same position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub chunk_id: i64,
    pub doc_id: i64,
    pub title: String,
}

/// Dense in-memory vector index over squared-L2 distance.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(Error::Index("dimensionality must be > 0".to_string()));
        }
        Ok(Self {
            dims,
            data: Vec::new(),
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector; its position is the current length.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dims {
            return Err(Error::Index(format!(
                "vector has {} dims, index expects {}",
                vector.len(),
                self.dims
            )));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Nearest neighbors of `query`: `(position, squared-L2 distance)`
    /// pairs, ascending by distance, position as the tie-break. Requires
    /// `k >= 1`; returns all vectors when the index holds fewer than `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 {
            return Err(Error::Index("k must be >= 1".to_string()));
        }
        if query.len() != self.dims {
            return Err(Error::Index(format!(
                "query has {} dims, index expects {}",
                query.len(),
                self.dims
            )));
        }

        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(pos, vec)| (pos, squared_l2(query, vec)))
            .collect();

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Write the index to disk: magic, version, dims, count, then the
    /// vector payload as little-endian f32.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::File::create(path)?;
        file.write_all(MAGIC)?;
        file.write_all(&VERSION.to_le_bytes())?;
        file.write_all(&(self.dims as u64).to_le_bytes())?;
        file.write_all(&(self.len() as u64).to_le_bytes())?;

        let mut payload = Vec::with_capacity(self.data.len() * 4);
        for &v in &self.data {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        file.write_all(&payload)?;
        file.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::IndexUnavailable(format!(
                "{} is not a vector index file",
                path.display()
            )));
        }

        let mut word = [0u8; 4];
        file.read_exact(&mut word)?;
        let version = u32::from_le_bytes(word);
        if version != VERSION {
            return Err(Error::IndexUnavailable(format!(
                "unsupported index version {}",
                version
            )));
        }

        let mut long = [0u8; 8];
        file.read_exact(&mut long)?;
        let dims = u64::from_le_bytes(long) as usize;
        file.read_exact(&mut long)?;
        let count = u64::from_le_bytes(long) as usize;

        if dims == 0 {
            return Err(Error::IndexUnavailable(
                "index header declares zero dimensions".to_string(),
            ));
        }

        let expected_len = dims
            .checked_mul(count)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                Error::IndexUnavailable("index header declares an impossible size".to_string())
            })?;

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;
        if payload.len() != expected_len {
            return Err(Error::IndexUnavailable(format!(
                "index payload is {} bytes, header declares {} vectors of {} dims",
                payload.len(),
                count,
                dims
            )));
        }

        let data: Vec<f32> = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self { dims, data })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

pub fn save_metadata(path: &Path, meta: &[ChunkMeta]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(meta)
        .map_err(|e| Error::Index(format!("metadata encode failed: {}", e)))?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_metadata(path: &Path) -> Result<Vec<ChunkMeta>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::IndexUnavailable(format!("metadata file is corrupt: {}", e)))
}

/// Load the index/metadata pair, enforcing the pairing invariants.
///
/// A missing file or a length mismatch is an [`Error::IndexUnavailable`],
/// distinct from "no results"; the caller reports it as such and keyword
/// search stays usable.
pub fn load_pair(config: &Config) -> Result<(FlatIndex, Vec<ChunkMeta>)> {
    let index_path = &config.index.index_path;
    let meta_path = &config.index.meta_path;

    if !index_path.exists() || !meta_path.exists() {
        return Err(Error::IndexUnavailable(format!(
            "missing {} or {}",
            index_path.display(),
            meta_path.display()
        )));
    }

    let index = FlatIndex::load(index_path)?;
    let meta = load_metadata(meta_path)?;

    if index.len() != meta.len() {
        return Err(Error::IndexUnavailable(format!(
            "index holds {} vectors but metadata lists {} chunks",
            index.len(),
            meta.len()
        )));
    }

    Ok((index, meta))
}

/// Outcome summary of a full rebuild.
#[derive(Debug)]
pub struct RebuildReport {
    pub chunk_count: usize,
    pub dims: usize,
    pub batches: usize,
}

/// Rebuild the vector index from every chunk currently in the store.
///
/// Chunks are read in chunk-id order (the same stable order every time),
/// embedded in batches with input order preserved across batches, and the
/// resulting index and metadata files replace any prior pair wholesale.
pub async fn rebuild(config: &Config, pool: &SqlitePool) -> Result<RebuildReport> {
    let rows = sqlx::query(
        r#"
        SELECT c.chunk_id, c.doc_id, c.chunk_text, d.title
        FROM chunks c
        JOIN documents d ON d.doc_id = c.doc_id
        ORDER BY c.chunk_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Err(Error::Index(
            "no chunks to index; ingest documents first".to_string(),
        ));
    }

    let mut meta: Vec<ChunkMeta> = Vec::with_capacity(rows.len());
    let mut texts: Vec<String> = Vec::with_capacity(rows.len());
    for row in &rows {
        meta.push(ChunkMeta {
            chunk_id: row.get("chunk_id"),
            doc_id: row.get("doc_id"),
            title: row.get("title"),
        });
        texts.push(row.get("chunk_text"));
    }

    info!(chunks = texts.len(), "rebuilding vector index");

    let batch_size = config.embedding.batch_size.max(1);
    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    let mut batches = 0usize;

    for batch in texts.chunks(batch_size) {
        let vectors = embedding::embed_texts(&config.embedding, batch).await?;
        embeddings.extend(vectors);
        batches += 1;
        debug!(batch = batches, embedded = embeddings.len(), "batch done");
    }

    let dims = embeddings
        .first()
        .map(|v| v.len())
        .filter(|&d| d > 0)
        .ok_or_else(|| Error::Provider("provider returned no vectors".to_string()))?;

    let mut index = FlatIndex::new(dims)?;
    for vector in &embeddings {
        index.add(vector)?;
    }

    index.save(&config.index.index_path)?;
    save_metadata(&config.index.meta_path, &meta)?;

    info!(
        vectors = index.len(),
        dims, "vector index and metadata written"
    );

    Ok(RebuildReport {
        chunk_count: index.len(),
        dims,
        batches,
    })
}

/// CLI entry point for `lore index rebuild`.
pub async fn run_rebuild(config: &Config) -> anyhow::Result<()> {
    if !config.embedding.is_enabled() {
        anyhow::bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    // Fails fast on missing model config or credentials, before any chunk
    // is read.
    let provider = embedding::create_provider(&config.embedding)?;

    let pool = crate::db::connect(config).await?;
    let report = rebuild(config, &pool).await?;
    pool.close().await;

    println!("index rebuild");
    println!("  model: {}", provider.model_name());
    println!("  chunks embedded: {}", report.chunk_count);
    println!("  dimensions: {}", report.dims);
    println!("  batches: {}", report.batches);
    println!("  index: {}", config.index.index_path.display());
    println!("  metadata: {}", config.index.meta_path.display());
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_vectors() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 2.0, 0.0],
            vec![3.0, 3.0, 3.0],
        ]
    }

    fn build_index(vectors: &[Vec<f32>]) -> FlatIndex {
        let mut index = FlatIndex::new(vectors[0].len()).unwrap();
        for v in vectors {
            index.add(v).unwrap();
        }
        index
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let index = build_index(&sample_vectors());
        let hits = index.search(&[0.9, 0.0, 0.0], 4).unwrap();

        let positions: Vec<usize> = hits.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![1, 0, 2, 3]);
        for pair in hits.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn self_query_returns_self_at_distance_zero() {
        let vectors = sample_vectors();
        let index = build_index(&vectors);

        for (i, v) in vectors.iter().enumerate() {
            let hits = index.search(v, 1).unwrap();
            assert_eq!(hits[0].0, i);
            assert!(hits[0].1.abs() < 1e-6);
        }
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let index = build_index(&sample_vectors());
        let hits = index.search(&[0.0, 0.0, 0.0], 100).unwrap();
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn zero_k_is_rejected() {
        let index = build_index(&sample_vectors());
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 0),
            Err(Error::Index(_))
        ));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut index = build_index(&sample_vectors());
        assert!(index.add(&[1.0, 2.0]).is_err());
        assert!(index.search(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn save_load_roundtrip_preserves_search() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("chunks.lbvx");

        let index = build_index(&sample_vectors());
        index.save(&path).unwrap();

        let loaded = FlatIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.dims(), index.dims());

        let query = [0.9, 0.0, 0.0];
        assert_eq!(
            index.search(&query, 4).unwrap(),
            loaded.search(&query, 4).unwrap()
        );
    }

    #[test]
    fn rebuilding_from_same_vectors_is_idempotent() {
        let vectors = sample_vectors();
        let a = build_index(&vectors);
        let b = build_index(&vectors);

        assert_eq!(a.len(), b.len());
        let query = [0.5, 1.5, 0.1];
        assert_eq!(a.search(&query, 4).unwrap(), b.search(&query, 4).unwrap());
    }

    #[test]
    fn garbage_file_reports_index_unavailable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("junk.lbvx");
        std::fs::write(&path, b"this is not an index").unwrap();

        assert!(matches!(
            FlatIndex::load(&path),
            Err(Error::IndexUnavailable(_))
        ));
    }

    #[test]
    fn truncated_payload_reports_index_unavailable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("short.lbvx");

        let index = build_index(&sample_vectors());
        index.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(
            FlatIndex::load(&path),
            Err(Error::IndexUnavailable(_))
        ));
    }

    #[test]
    fn metadata_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("chunks.meta.json");

        let meta = vec![
            ChunkMeta {
                chunk_id: 1,
                doc_id: 1,
                title: "Introduction to Prayer".to_string(),
            },
            ChunkMeta {
                chunk_id: 2,
                doc_id: 1,
                title: "Introduction to Prayer".to_string(),
            },
        ];
        save_metadata(&path, &meta).unwrap();
        assert_eq!(load_metadata(&path).unwrap(), meta);
    }

    fn pair_config(tmp: &TempDir) -> Config {
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

    #[test]
    fn missing_pair_is_unavailable_not_empty() {
        let tmp = TempDir::new().unwrap();
        let config = pair_config(&tmp);

        assert!(matches!(
            load_pair(&config),
            Err(Error::IndexUnavailable(_))
        ));
    }

    #[test]
    fn lone_index_file_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let config = pair_config(&tmp);

        build_index(&sample_vectors())
            .save(&config.index.index_path)
            .unwrap();

        assert!(matches!(
            load_pair(&config),
            Err(Error::IndexUnavailable(_))
        ));
    }

    #[test]
    fn length_mismatch_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let config = pair_config(&tmp);

        build_index(&sample_vectors())
            .save(&config.index.index_path)
            .unwrap();
        save_metadata(
            &config.index.meta_path,
            &[ChunkMeta {
                chunk_id: 1,
                doc_id: 1,
                title: "only one".to_string(),
            }],
        )
        .unwrap();

        let err = load_pair(&config).unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
        assert!(err.to_string().contains("4 vectors"));
    }

    #[test]
    fn matched_pair_loads() {
        let tmp = TempDir::new().unwrap();
        let config = pair_config(&tmp);

        let vectors = sample_vectors();
        build_index(&vectors).save(&config.index.index_path).unwrap();
        let meta: Vec<ChunkMeta> = (0..vectors.len())
            .map(|i| ChunkMeta {
                chunk_id: i as i64 + 1,
                doc_id: 1,
                title: format!("doc {}", i),
            })
            .collect();
        save_metadata(&config.index.meta_path, &meta).unwrap();

        let (index, loaded_meta) = load_pair(&config).unwrap();
        assert_eq!(index.len(), loaded_meta.len());
    }
}
