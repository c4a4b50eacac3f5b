//! Answer synthesis collaborator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;
use crate::models::SynthesisConfig;
use crate::utils::retry::{RetryConfig, with_retry};

/// Composes an answer from a query and supporting evidence texts.
///
/// The language-model call is a capability this crate depends on, not one it
/// implements; `supporting_texts` is empty for fallback answers.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        query: &str,
        supporting_texts: &[String],
    ) -> Result<String, SynthesisError>;
}

/// Request body for the /generate endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    query: &'a str,
    context: &'a [String],
}

/// Response from the /generate endpoint.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    answer: String,
}

/// Client for an HTTP completion server.
#[derive(Debug, Clone)]
pub struct HttpSynthesizer {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl HttpSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    async fn generate(
        &self,
        query: &str,
        supporting_texts: &[String],
    ) -> Result<String, SynthesisError> {
        let url = format!("{}/generate", self.base_url);
        let request = GenerateRequest {
            query,
            context: supporting_texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else if e.is_connect() {
                    SynthesisError::Unavailable(e.to_string())
                } else {
                    SynthesisError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Server(format!("status {}: {}", status, body)));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;

        Ok(generated.answer)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        supporting_texts: &[String],
    ) -> Result<String, SynthesisError> {
        with_retry(&self.retry, || self.generate(query, supporting_texts)).await
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;

    /// Scripted synthesizer for router tests.
    pub(crate) struct StubSynthesizer {
        /// When set, every call fails with this message as a server error.
        pub fail_with: Option<String>,
    }

    impl StubSynthesizer {
        pub(crate) fn new() -> Self {
            Self { fail_with: None }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
            }
        }
    }

    #[async_trait]
    impl Synthesizer for StubSynthesizer {
        async fn synthesize(
            &self,
            query: &str,
            supporting_texts: &[String],
        ) -> Result<String, SynthesisError> {
            if let Some(ref message) = self.fail_with {
                return Err(SynthesisError::Server(message.clone()));
            }
            if supporting_texts.is_empty() {
                Ok(format!("direct answer to: {}", query))
            } else {
                Ok(format!(
                    "grounded answer to '{}' from {} snippets",
                    query,
                    supporting_texts.len()
                ))
            }
        }
    }
}
