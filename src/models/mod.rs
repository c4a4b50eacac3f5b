mod answer;
mod config;
mod document;
mod format;

pub use answer::{Answer, RouteResult, TOOL_FALLBACK, TOOL_RETRIEVAL_QA};
pub use config::{
    ChunkingConfig, Config, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_EMBEDDING_URL, DEFAULT_SYNTHESIS_URL, EmbeddingConfig, IndexConfig, RetrievalConfig,
    RouterConfig, SynthesisConfig,
};
pub use document::{Document, DocumentChunk, ScoredChunk};
pub use format::OutputFormat;
