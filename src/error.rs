//! Error types for the document QA pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding server unreachable: {0}")]
    Unavailable(String),

    #[error("embedding server error: {0}")]
    Server(String),

    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timed out")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::Unavailable(_) | EmbeddingError::Timeout => true,
            // Server errors might be transient (e.g., 503 Service Unavailable)
            EmbeddingError::Server(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            // Request errors depend on the underlying cause
            EmbeddingError::Request(e) => e.is_timeout() || e.is_connect(),
            // Invalid responses are not retryable
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to the answer synthesis collaborator.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis server unreachable: {0}")]
    Unavailable(String),

    #[error("synthesis server error: {0}")]
    Server(String),

    #[error("synthesis request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid synthesis response: {0}")]
    InvalidResponse(String),

    #[error("synthesis timed out")]
    Timeout,
}

impl Retryable for SynthesisError {
    fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Unavailable(_) | SynthesisError::Timeout => true,
            SynthesisError::Server(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
            }
            SynthesisError::Request(e) => e.is_timeout() || e.is_connect(),
            SynthesisError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to the durable vector index.
#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("index IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("embedding dimension mismatch: index stores {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "embedder mismatch: index was built with '{stored}', configured model is '{configured}'"
    )]
    EmbedderMismatch { stored: String, configured: String },
}

/// Errors related to query-time retrieval.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] VectorIndexError),
}

/// Errors raised by answer tools inside the router.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),
}

/// Errors related to document discovery and text extraction.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("directory walk error: {0}")]
    Walk(String),

    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("text extraction failed for {path}: {reason}")]
    Extract { path: PathBuf, reason: String },

    #[error("pdftotext not available: {0} (is poppler installed?)")]
    ToolMissing(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    Path(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] VectorIndexError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Other(String),
}
