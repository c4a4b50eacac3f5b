//! Query-time retrieval: embed the query, ask the index for neighbors.

use std::sync::Arc;

use crate::error::RetrievalError;
use crate::models::ScoredChunk;
use crate::services::embedding::Embedder;
use crate::services::index::VectorIndex;

/// Retrieves the top-k most similar chunks above a relevance threshold.
///
/// The index handle is passed per call; its lifecycle belongs to the caller.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Embed `query` and return up to `k` chunks with score >= `min_score`.
    ///
    /// An empty index yields an empty sequence; callers distinguish that from
    /// "no relevant matches" by checking `index.is_empty()` themselves.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_query(query).await?;
        let results = index.query(&embedding, k, min_score)?;
        Ok(results)
    }
}
