//! Document and chunk models.

use serde::{Deserialize, Serialize};

/// A source document: an identifier plus the raw text extracted from it.
///
/// Immutable once ingested; re-ingesting the same source replaces its chunks
/// rather than mutating them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable id derived from the source identifier.
    pub id: String,
    /// Source file identifier (name or path) as supplied by the caller.
    pub source_id: String,
    /// Raw extracted text.
    pub content: String,
    /// SHA-256 checksum of the content.
    pub checksum: String,
    pub created_at: String,
}

impl Document {
    /// Derive a stable document id from the source identifier.
    pub fn generate_id(source_id: &str) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(source_id.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(source_id: impl Into<String>, content: String) -> Self {
        let source_id = source_id.into();
        let id = Self::generate_id(&source_id);
        let checksum = crate::utils::calculate_checksum(&content);
        Self {
            id,
            source_id,
            content,
            checksum,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A bounded passage of a document's text, the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Deterministic id derived from (document id, chunk index, start offset).
    pub id: String,
    pub document_id: String,
    /// Source document name, carried for answer traceability.
    pub source_id: String,
    pub content: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub start_offset: u64,
    pub end_offset: u64,
}

impl DocumentChunk {
    /// Derive a deterministic chunk id.
    ///
    /// UUID v5 over `document_id:chunk_index:start_offset`, so re-chunking the
    /// same document with the same parameters reproduces the same ids.
    pub fn generate_id(document_id: &str, chunk_index: u32, start_offset: u64) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}:{}", document_id, chunk_index, start_offset);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        content: String,
        chunk_index: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        let id = Self::generate_id(&document.id, chunk_index, start_offset);
        Self {
            id,
            document_id: document.id.clone(),
            source_id: document.source_id.clone(),
            content,
            chunk_index,
            total_chunks,
            start_offset,
            end_offset,
        }
    }
}

/// A chunk paired with its similarity score for a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_generate_id_deterministic() {
        let a = Document::generate_id("policies.pdf");
        let b = Document::generate_id("policies.pdf");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, Document::generate_id("other.pdf"));
    }

    #[test]
    fn test_chunk_generate_id_deterministic() {
        let id = DocumentChunk::generate_id("abc123", 5, 2000);
        assert_eq!(id.len(), 36);
        assert_eq!(id, DocumentChunk::generate_id("abc123", 5, 2000));
        assert_ne!(id, DocumentChunk::generate_id("abc123", 6, 2000));
        assert_ne!(id, DocumentChunk::generate_id("abc123", 5, 2400));
    }

    #[test]
    fn test_document_new_sets_checksum() {
        let doc = Document::new("faq.pdf", "Refunds are issued within 30 days.".to_string());
        assert!(!doc.id.is_empty());
        assert_eq!(doc.checksum.len(), 64);
        assert!(!doc.created_at.is_empty());
    }
}
