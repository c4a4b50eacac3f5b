//! Query routing: classify, dispatch to an answer tool, always return a
//! structured result.
//!
//! Each query runs `Classifying -> {Retrieving -> Synthesizing,
//! FallbackAnswering} -> Done`; the router holds no state across calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolError;
use crate::models::{
    RetrievalConfig, RouteResult, RouterConfig, TOOL_FALLBACK, TOOL_RETRIEVAL_QA,
};
use crate::services::index::VectorIndex;
use crate::services::retriever::Retriever;
use crate::services::synthesis::Synthesizer;

/// What a tool produced for a query.
#[derive(Debug)]
pub enum ToolOutcome {
    /// A finished structured result.
    Answered(RouteResult),
    /// The tool declined: it found no evidence to ground an answer on.
    NoGrounding,
}

/// A named answering strategy the router can dispatch to.
///
/// Tools register by name, so strategies beyond retrieval and fallback can be
/// added without touching the router.
#[async_trait]
pub trait AnswerTool: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, index: &VectorIndex, query: &str) -> Result<ToolOutcome, ToolError>;
}

/// Retrieval-grounded QA: retrieve evidence chunks, then synthesize an answer
/// from them. Declines when nothing clears the relevance threshold.
pub struct RetrievalQaTool {
    retriever: Retriever,
    synthesizer: Arc<dyn Synthesizer>,
    retrieval: RetrievalConfig,
}

impl RetrievalQaTool {
    pub fn new(
        retriever: Retriever,
        synthesizer: Arc<dyn Synthesizer>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            retriever,
            synthesizer,
            retrieval,
        }
    }
}

#[async_trait]
impl AnswerTool for RetrievalQaTool {
    fn name(&self) -> &'static str {
        TOOL_RETRIEVAL_QA
    }

    async fn run(&self, index: &VectorIndex, query: &str) -> Result<ToolOutcome, ToolError> {
        let hits = self
            .retriever
            .retrieve(
                index,
                query,
                self.retrieval.top_k as usize,
                self.retrieval.min_score,
            )
            .await?;

        if hits.is_empty() {
            return Ok(ToolOutcome::NoGrounding);
        }

        let snippets: Vec<String> = hits.iter().map(|hit| hit.chunk.content.clone()).collect();
        let answer = self.synthesizer.synthesize(query, &snippets).await?;

        Ok(ToolOutcome::Answered(RouteResult::grounded(
            TOOL_RETRIEVAL_QA,
            answer,
            snippets,
        )))
    }
}

/// Answers without retrieval context.
pub struct FallbackTool {
    synthesizer: Arc<dyn Synthesizer>,
}

impl FallbackTool {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl AnswerTool for FallbackTool {
    fn name(&self) -> &'static str {
        TOOL_FALLBACK
    }

    async fn run(&self, _index: &VectorIndex, query: &str) -> Result<ToolOutcome, ToolError> {
        let answer = self.synthesizer.synthesize(query, &[]).await?;
        Ok(ToolOutcome::Answered(RouteResult::direct(
            TOOL_FALLBACK,
            answer,
        )))
    }
}

/// Classifies queries and dispatches them over the registered tools.
pub struct Router {
    tools: BTreeMap<&'static str, Box<dyn AnswerTool>>,
    config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            tools: BTreeMap::new(),
            config,
        }
    }

    /// Router with the two built-in tools registered.
    pub fn with_default_tools(
        retriever: Retriever,
        synthesizer: Arc<dyn Synthesizer>,
        retrieval: RetrievalConfig,
        config: RouterConfig,
    ) -> Self {
        let mut router = Self::new(config);
        router.register(Box::new(RetrievalQaTool::new(
            retriever,
            Arc::clone(&synthesizer),
            retrieval,
        )));
        router.register(Box::new(FallbackTool::new(synthesizer)));
        router
    }

    pub fn register(&mut self, tool: Box<dyn AnswerTool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    /// Select a tool for the query.
    ///
    /// Fallback when the index is empty or, with a configured domain
    /// vocabulary, when the query matches none of it. With no vocabulary,
    /// every query on a populated index attempts retrieval and the
    /// `min_score` grounding gate decides from there.
    fn classify(&self, index: &VectorIndex, query: &str) -> &'static str {
        if index.is_empty() {
            return TOOL_FALLBACK;
        }

        if !self.config.keywords.is_empty() {
            let lowered = query.to_lowercase();
            let matched = self
                .config
                .keywords
                .iter()
                .any(|keyword| lowered.contains(&keyword.to_lowercase()));
            if !matched {
                return TOOL_FALLBACK;
            }
        }

        TOOL_RETRIEVAL_QA
    }

    /// Route one query to an answer.
    ///
    /// Never returns an error: tool failures become a structured result
    /// naming the attempted tool and the reason.
    pub async fn route(&self, index: &VectorIndex, query: &str) -> RouteResult {
        let selected = self.classify(index, query);
        let selected = if self.tools.contains_key(selected) {
            selected
        } else {
            TOOL_FALLBACK
        };

        match self.run_tool(selected, index, query).await {
            Ok(ToolOutcome::Answered(result)) => result,
            Ok(ToolOutcome::NoGrounding) if selected != TOOL_FALLBACK => {
                // Grounded answers must have grounding; hand over to fallback.
                match self.run_tool(TOOL_FALLBACK, index, query).await {
                    Ok(ToolOutcome::Answered(result)) => result,
                    Ok(ToolOutcome::NoGrounding) => {
                        RouteResult::failure(TOOL_FALLBACK, "no tool produced an answer")
                    }
                    Err(e) => RouteResult::failure(TOOL_FALLBACK, e),
                }
            }
            Ok(ToolOutcome::NoGrounding) => {
                RouteResult::failure(selected, "no tool produced an answer")
            }
            Err(e) => RouteResult::failure(selected, e),
        }
    }

    async fn run_tool(
        &self,
        name: &'static str,
        index: &VectorIndex,
        query: &str,
    ) -> Result<ToolOutcome, ToolError> {
        match self.tools.get(name) {
            Some(tool) => tool.run(index, query).await,
            None => Ok(ToolOutcome::NoGrounding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::services::chunker::TextChunker;
    use crate::services::embedding::stub::StubEmbedder;
    use crate::services::ingest::IngestionPipeline;
    use crate::services::synthesis::stub::StubSynthesizer;

    const DIM: usize = 64;

    fn router_with(
        embedder: StubEmbedder,
        synthesizer: StubSynthesizer,
        retrieval: RetrievalConfig,
        config: RouterConfig,
    ) -> Router {
        Router::with_default_tools(
            Retriever::new(Arc::new(embedder)),
            Arc::new(synthesizer),
            retrieval,
            config,
        )
    }

    fn default_router() -> Router {
        router_with(
            StubEmbedder::new(DIM),
            StubSynthesizer::new(),
            RetrievalConfig {
                top_k: 3,
                min_score: 0.1,
            },
            RouterConfig::default(),
        )
    }

    fn empty_index(dir: &tempfile::TempDir) -> VectorIndex {
        VectorIndex::open_or_create(dir.path().join("index.json"), "stub-embedder-v1", DIM)
            .unwrap()
    }

    async fn refund_index(dir: &tempfile::TempDir) -> VectorIndex {
        let mut index = empty_index(dir);
        let pipeline = IngestionPipeline::new(
            Arc::new(StubEmbedder::new(DIM)),
            TextChunker::with_defaults(),
            8,
        );
        pipeline
            .ingest(
                &mut index,
                vec![Document::new(
                    "refunds.pdf",
                    "Refunds are issued within 30 days of purchase.".to_string(),
                )],
            )
            .await;
        index
    }

    #[tokio::test]
    async fn test_empty_index_routes_to_fallback_without_snippets() {
        let dir = tempfile::TempDir::new().unwrap();
        let index = empty_index(&dir);
        let router = default_router();

        let result = router.route(&index, "What is the refund policy?").await;

        assert_eq!(result.tool, TOOL_FALLBACK);
        assert!(result.snippets().is_none());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.as_object().unwrap().get("snippets").is_none());
    }

    #[tokio::test]
    async fn test_relevant_chunk_routes_to_retrieval_qa_with_snippet() {
        let dir = tempfile::TempDir::new().unwrap();
        let index = refund_index(&dir).await;
        let router = default_router();

        let result = router
            .route(&index, "How long do refunds take after purchase?")
            .await;

        assert_eq!(result.tool, TOOL_RETRIEVAL_QA);
        let snippets = result.snippets().expect("grounded result has snippets");
        assert!(
            snippets
                .iter()
                .any(|s| s.contains("Refunds are issued within 30 days"))
        );
    }

    #[tokio::test]
    async fn test_zero_hits_above_threshold_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let index = refund_index(&dir).await;
        let router = router_with(
            StubEmbedder::new(DIM),
            StubSynthesizer::new(),
            RetrievalConfig {
                top_k: 3,
                min_score: 0.99,
            },
            RouterConfig::default(),
        );

        let result = router
            .route(&index, "entirely unrelated zebra migration trivia")
            .await;

        // Grounding property: no hits above min_score means no retrieval_qa.
        assert_eq!(result.tool, TOOL_FALLBACK);
        assert!(result.snippets().is_none());
    }

    #[tokio::test]
    async fn test_keyword_vocabulary_gates_retrieval() {
        let dir = tempfile::TempDir::new().unwrap();
        let index = refund_index(&dir).await;
        let router = router_with(
            StubEmbedder::new(DIM),
            StubSynthesizer::new(),
            RetrievalConfig {
                top_k: 3,
                min_score: 0.1,
            },
            RouterConfig {
                keywords: vec!["refund".to_string(), "purchase".to_string()],
            },
        );

        let off_topic = router.route(&index, "tell me a joke").await;
        assert_eq!(off_topic.tool, TOOL_FALLBACK);

        let on_topic = router
            .route(&index, "When are Refunds issued after purchase?")
            .await;
        assert_eq!(on_topic.tool, TOOL_RETRIEVAL_QA);
    }

    #[tokio::test]
    async fn test_synthesis_failure_becomes_structured_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let index = refund_index(&dir).await;
        let router = router_with(
            StubEmbedder::new(DIM),
            StubSynthesizer::failing("model overloaded"),
            RetrievalConfig {
                top_k: 3,
                min_score: 0.1,
            },
            RouterConfig::default(),
        );

        let result = router.route(&index, "How long do refunds take?").await;

        assert_eq!(result.tool, TOOL_RETRIEVAL_QA);
        assert!(result.answer_text().starts_with("unable to answer:"));
        assert!(result.answer_text().contains("model overloaded"));
        assert!(result.snippets().is_none());
    }

    #[tokio::test]
    async fn test_embedder_failure_becomes_structured_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let index = refund_index(&dir).await;

        let mut embedder = StubEmbedder::new(DIM);
        embedder.fail_on.push("refund".to_string());
        let router = router_with(
            embedder,
            StubSynthesizer::new(),
            RetrievalConfig {
                top_k: 3,
                min_score: 0.1,
            },
            RouterConfig::default(),
        );

        let result = router.route(&index, "refund timing?").await;

        assert_eq!(result.tool, TOOL_RETRIEVAL_QA);
        assert!(result.answer_text().starts_with("unable to answer:"));
    }

    #[tokio::test]
    async fn test_registry_accepts_additional_tools() {
        struct CannedTool;

        #[async_trait]
        impl AnswerTool for CannedTool {
            fn name(&self) -> &'static str {
                "canned"
            }

            async fn run(
                &self,
                _index: &VectorIndex,
                query: &str,
            ) -> Result<ToolOutcome, ToolError> {
                Ok(ToolOutcome::Answered(RouteResult::direct(
                    "canned",
                    format!("canned: {}", query),
                )))
            }
        }

        let mut router = default_router();
        router.register(Box::new(CannedTool));

        assert_eq!(
            router.tool_names(),
            vec!["canned", TOOL_FALLBACK, TOOL_RETRIEVAL_QA]
        );
    }
}
