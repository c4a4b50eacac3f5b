pub mod chunker;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod router;
pub mod synthesis;

pub use chunker::TextChunker;
pub use embedding::{Embedder, HttpEmbedder};
pub use index::{IndexHeader, VectorIndex};
pub use ingest::{IngestReport, IngestionPipeline};
pub use retriever::Retriever;
pub use router::{AnswerTool, FallbackTool, RetrievalQaTool, Router, ToolOutcome};
pub use synthesis::{HttpSynthesizer, Synthesizer};
