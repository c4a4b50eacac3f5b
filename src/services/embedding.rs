//! Embedding collaborator: maps text to fixed-dimension vectors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryConfig, with_retry};

/// Maps text to fixed-dimension vectors using one consistent model.
///
/// `model_id` and `dimension` tag the vector index so mismatched embedder
/// versions are refused instead of silently corrupting similarity scores.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model/version.
    fn model_id(&self) -> &str;

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts. Order-preserving, same length as the input.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let embeddings = self.embed_batch(vec![text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }
}

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
}

/// Response from the /embed endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse(Vec<Vec<f32>>);

/// Health response from the /health endpoint.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

/// Client for an HTTP embedding server.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    batch_size: usize,
    retry: RetryConfig,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size as usize,
            retry: RetryConfig::default(),
        })
    }

    /// Check if the embedding server is healthy and ready.
    pub async fn health_check(&self) -> Result<HealthResponse, EmbeddingError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Server(format!(
                "health check failed with status: {}",
                response.status()
            )));
        }

        // Server may return an empty body on health check
        let text = response.text().await.unwrap_or_default();
        if text.is_empty() {
            return Ok(HealthResponse {
                status: Some("healthy".to_string()),
                model_id: None,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))
    }

    async fn embed_single_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest {
            model: self.model.clone(),
            inputs: texts,
            truncate: Some(true),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::Unavailable(e.to_string())
                } else {
                    EmbeddingError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Server(format!("status {}: {}", status, body)));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        for vector in &embed_response.0 {
            if vector.len() != self.dimension {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected dimension {}, server returned {}",
                    self.dimension,
                    vector.len()
                )));
            }
        }

        Ok(embed_response.0)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size.max(1)) {
            let embeddings =
                with_retry(&self.retry, || self.embed_single_batch(chunk.to_vec())).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;

    /// Deterministic in-process embedder for tests.
    ///
    /// Hashes each whitespace token into a bucket so that texts sharing words
    /// land near each other under cosine similarity.
    pub(crate) struct StubEmbedder {
        pub dimension: usize,
        /// Substrings that trigger an `Unavailable` failure when embedded.
        pub fail_on: Vec<String>,
    }

    impl StubEmbedder {
        pub(crate) fn new(dimension: usize) -> Self {
            Self {
                dimension,
                fail_on: Vec::new(),
            }
        }

        pub(crate) fn embed_text(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0f32; self.dimension];
            for token in text.to_lowercase().split_whitespace() {
                let token: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
                if token.is_empty() {
                    continue;
                }
                let mut h: u64 = 1469598103934665603;
                for b in token.bytes() {
                    h ^= u64::from(b);
                    h = h.wrapping_mul(1099511628211);
                }
                v[(h % self.dimension as u64) as usize] += 1.0;
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in &mut v {
                    *x /= norm;
                }
            }
            v
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn model_id(&self) -> &str {
            "stub-embedder-v1"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            for text in &texts {
                if self.fail_on.iter().any(|marker| text.contains(marker)) {
                    return Err(EmbeddingError::Unavailable(
                        "stub embedder configured to fail".to_string(),
                    ));
                }
            }
            Ok(texts.iter().map(|t| self.embed_text(t)).collect())
        }
    }
}
