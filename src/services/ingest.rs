//! Ingestion pipeline: documents in, index entries out, idempotently.

use std::sync::Arc;

use crate::models::{Document, DocumentChunk};
use crate::services::chunker::TextChunker;
use crate::services::embedding::Embedder;
use crate::services::index::VectorIndex;

/// One document that could not be ingested.
#[derive(Debug, Clone)]
pub struct DocumentFailure {
    pub source_id: String,
    pub reason: String,
}

/// Outcome of one ingestion run. `added`/`skipped` count chunks; `failed`
/// counts documents.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: Vec<DocumentFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orchestrates Chunker -> Embedder -> VectorIndex.
///
/// Chunk ids are deterministic, so the pipeline diffs against the index and
/// only embeds chunks it has not stored yet; re-running on an unchanged
/// corpus is a no-op beyond that diff.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: TextChunker, batch_size: usize) -> Self {
        Self {
            embedder,
            chunker,
            batch_size: batch_size.max(1),
        }
    }

    /// Ingest a set of documents.
    ///
    /// A failure embedding or storing one document's chunks is recorded in
    /// the report and does not abort the remaining documents. Each document
    /// is upserted in one atomic batch, so interrupting a long run between
    /// documents leaves the index valid.
    pub async fn ingest(&self, index: &mut VectorIndex, documents: Vec<Document>) -> IngestReport {
        let mut report = IngestReport::default();
        let existing = index.ids();

        for document in documents {
            report.documents += 1;

            let chunks = self.chunker.chunk(&document);
            let (new, already_present): (Vec<_>, Vec<_>) = chunks
                .into_iter()
                .partition(|chunk| !existing.contains(&chunk.id));

            report.skipped += already_present.len();

            if new.is_empty() {
                continue;
            }

            match self.embed_and_upsert(index, new).await {
                Ok(count) => report.added += count,
                Err(reason) => report.failed.push(DocumentFailure {
                    source_id: document.source_id.clone(),
                    reason,
                }),
            }
        }

        report
    }

    async fn embed_and_upsert(
        &self,
        index: &mut VectorIndex,
        chunks: Vec<DocumentChunk>,
    ) -> Result<usize, String> {
        let mut pairs = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self
                .embedder
                .embed_batch(texts)
                .await
                .map_err(|e| e.to_string())?;

            if embeddings.len() != batch.len() {
                return Err(format!(
                    "embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                ));
            }

            pairs.extend(batch.iter().cloned().zip(embeddings));
        }

        let count = pairs.len();
        index.upsert(pairs).map_err(|e| e.to_string())?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding::stub::StubEmbedder;

    const DIM: usize = 32;

    fn pipeline_with(embedder: StubEmbedder) -> IngestionPipeline {
        IngestionPipeline::new(Arc::new(embedder), TextChunker::with_defaults(), 4)
    }

    fn open_index(dir: &tempfile::TempDir) -> VectorIndex {
        VectorIndex::open_or_create(dir.path().join("index.json"), "stub-embedder-v1", DIM)
            .unwrap()
    }

    fn corpus() -> Vec<Document> {
        vec![
            Document::new(
                "a.pdf",
                "Refunds are issued within 30 days of purchase.".to_string(),
            ),
            Document::new(
                "b.pdf",
                "Shipping takes five to seven business days in most regions.".to_string(),
            ),
            Document::new(
                "c.pdf",
                "Support is available by email around the clock.".to_string(),
            ),
        ]
    }

    #[tokio::test]
    async fn test_ingest_adds_all_chunks() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut index = open_index(&dir);
        let pipeline = pipeline_with(StubEmbedder::new(DIM));

        let report = pipeline.ingest(&mut index, corpus()).await;

        assert_eq!(report.documents, 3);
        assert_eq!(report.added, 3);
        assert_eq!(report.skipped, 0);
        assert!(report.is_clean());
        assert_eq!(index.size(), 3);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut index = open_index(&dir);
        let pipeline = pipeline_with(StubEmbedder::new(DIM));

        pipeline.ingest(&mut index, corpus()).await;
        let size_after_first = index.size();

        let report = pipeline.ingest(&mut index, corpus()).await;

        assert_eq!(report.added, 0);
        assert_eq!(report.skipped, 3);
        assert!(report.is_clean());
        assert_eq!(index.size(), size_after_first);
    }

    #[tokio::test]
    async fn test_one_failing_document_does_not_abort_the_rest() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut index = open_index(&dir);

        let mut embedder = StubEmbedder::new(DIM);
        embedder.fail_on.push("Shipping".to_string());
        let pipeline = pipeline_with(embedder);

        let report = pipeline.ingest(&mut index, corpus()).await;

        assert_eq!(report.added, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].source_id, "b.pdf");
        assert!(report.failed[0].reason.contains("unreachable"));
        // a.pdf and c.pdf made it in despite b.pdf failing.
        let names = index.document_names();
        assert_eq!(names, vec!["a.pdf".to_string(), "c.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_document_retried_on_next_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut index = open_index(&dir);

        let mut failing = StubEmbedder::new(DIM);
        failing.fail_on.push("Shipping".to_string());
        let report = pipeline_with(failing).ingest(&mut index, corpus()).await;
        assert_eq!(report.failed.len(), 1);

        let report = pipeline_with(StubEmbedder::new(DIM))
            .ingest(&mut index, corpus())
            .await;
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 2);
        assert!(report.is_clean());
        assert_eq!(index.size(), 3);
    }

    #[tokio::test]
    async fn test_whitespace_document_produces_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut index = open_index(&dir);
        let pipeline = pipeline_with(StubEmbedder::new(DIM));

        let report = pipeline
            .ingest(
                &mut index,
                vec![Document::new("empty.pdf", "   \n\n  ".to_string())],
            )
            .await;

        assert_eq!(report.documents, 1);
        assert_eq!(report.added, 0);
        assert!(report.is_clean());
        assert!(index.is_empty());
    }
}
