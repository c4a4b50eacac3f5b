//! Durable vector index over chunk embeddings.
//!
//! A single JSON file holds every (chunk, embedding) pair plus a header tag
//! naming the embedder model and dimension that produced the vectors. The
//! index is exclusively owned by the process that opened it; concurrent
//! writers to the same location are not supported.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::VectorIndexError;
use crate::models::{DocumentChunk, ScoredChunk};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout of the index file.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    embedder_model: String,
    dimension: usize,
    records: BTreeMap<String, IndexRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

/// Stored header tag of a durable index file.
#[derive(Debug, Clone)]
pub struct IndexHeader {
    pub embedder_model: String,
    pub dimension: usize,
    pub chunks: usize,
}

/// Persistent store of (chunk, embedding) pairs with nearest-neighbor lookup.
///
/// Records live in a `BTreeMap` keyed by chunk id, so iteration order is
/// deterministic and score ties resolve by ascending id.
pub struct VectorIndex {
    path: PathBuf,
    embedder_model: String,
    dimension: usize,
    records: BTreeMap<String, IndexRecord>,
}

impl VectorIndex {
    /// Whether a durable index has been initialized at `path`.
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Load the index at `path`, or create an empty one if none exists.
    ///
    /// Fails with `Corrupt` if durable data exists but cannot be parsed or
    /// fails integrity checks, and with a mismatch error if the stored
    /// embedder tag differs from the configured one. Neither case falls back
    /// to an empty index; that would mask data loss.
    pub fn open_or_create(
        path: impl Into<PathBuf>,
        embedder_model: &str,
        dimension: usize,
    ) -> Result<Self, VectorIndexError> {
        let path = path.into();

        if !Self::exists(&path) {
            return Ok(Self {
                path,
                embedder_model: embedder_model.to_string(),
                dimension,
                records: BTreeMap::new(),
            });
        }

        let file = Self::load_file(&path)?;

        if file.embedder_model != embedder_model {
            return Err(VectorIndexError::EmbedderMismatch {
                stored: file.embedder_model,
                configured: embedder_model.to_string(),
            });
        }

        if file.dimension != dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: file.dimension,
                actual: dimension,
            });
        }

        Ok(Self {
            path,
            embedder_model: file.embedder_model,
            dimension: file.dimension,
            records: file.records,
        })
    }

    /// Read the stored header of an existing index file without comparing it
    /// to any configured embedder tag, so callers can report what an index
    /// was built with even when it no longer matches the configuration.
    pub fn read_header(path: &Path) -> Result<IndexHeader, VectorIndexError> {
        let file = Self::load_file(path)?;
        Ok(IndexHeader {
            embedder_model: file.embedder_model,
            dimension: file.dimension,
            chunks: file.records.len(),
        })
    }

    /// Parse and integrity-check the durable file.
    fn load_file(path: &Path) -> Result<IndexFile, VectorIndexError> {
        let content = fs::read_to_string(path)?;
        let file: IndexFile =
            serde_json::from_str(&content).map_err(|e| VectorIndexError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if file.version != FORMAT_VERSION {
            return Err(VectorIndexError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("unsupported format version {}", file.version),
            });
        }

        for (id, record) in &file.records {
            if record.embedding.len() != file.dimension {
                return Err(VectorIndexError::Corrupt {
                    path: path.to_path_buf(),
                    reason: format!(
                        "record {} has dimension {}, header says {}",
                        id,
                        record.embedding.len(),
                        file.dimension
                    ),
                });
            }
        }

        Ok(file)
    }

    /// Insert or replace (chunk, embedding) pairs, then persist.
    ///
    /// The whole batch is validated before any record is inserted, and the
    /// durable file is replaced atomically (temp file + rename), so a crash
    /// mid-batch never leaves a chunk without its embedding.
    pub fn upsert(
        &mut self,
        pairs: Vec<(DocumentChunk, Vec<f32>)>,
    ) -> Result<(), VectorIndexError> {
        if pairs.is_empty() {
            return Ok(());
        }

        for (_, embedding) in &pairs {
            if embedding.len() != self.dimension {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        for (chunk, embedding) in pairs {
            self.records
                .insert(chunk.id.clone(), IndexRecord { chunk, embedding });
        }

        self.persist()
    }

    /// Nearest-neighbor lookup by cosine similarity.
    ///
    /// Returns up to `k` chunks with score >= `min_score`, descending by
    /// score, ties broken by ascending chunk id. An empty index yields an
    /// empty result, never an error.
    pub fn query(
        &self,
        embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>, VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let mut scored: Vec<ScoredChunk> = self
            .records
            .values()
            .filter_map(|record| {
                let score = cosine_similarity(embedding, &record.embedding);
                if score.is_finite() && score >= min_score {
                    Some(ScoredChunk {
                        chunk: record.chunk.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        // Stable sort over the id-ordered record iteration keeps equal scores
        // in ascending id order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Count of stored chunks.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identifiers of every stored chunk; the ingestion pipeline diffs
    /// against this to skip re-embedding.
    pub fn ids(&self) -> BTreeSet<String> {
        self.records.keys().cloned().collect()
    }

    /// Sorted distinct source document names present in the index.
    pub fn document_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .records
            .values()
            .map(|r| r.chunk.source_id.clone())
            .collect();
        names.into_iter().collect()
    }

    pub fn embedder_model(&self) -> &str {
        &self.embedder_model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), VectorIndexError> {
        let file = IndexFile {
            version: FORMAT_VERSION,
            embedder_model: self.embedder_model.clone(),
            dimension: self.dimension,
            records: self.records.clone(),
        };

        let data = serde_json::to_string(&file).map_err(|e| VectorIndexError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Rename within the same directory is atomic on POSIX filesystems.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

/// Cosine similarity; robust to magnitude variation across inputs of
/// different length.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
