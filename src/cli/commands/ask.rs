use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, RetrievalConfig};
use crate::services::{
    Embedder, HttpEmbedder, HttpSynthesizer, Retriever, Router, VectorIndex,
};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question to answer")]
    pub query: String,

    #[arg(long, short = 'n', help = "Maximum number of chunks to retrieve")]
    pub top_k: Option<u32>,

    #[arg(long, help = "Minimum similarity for grounding (0.0-1.0)")]
    pub min_score: Option<f32>,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start = Instant::now();

    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        anyhow::bail!("top_k must be at least 1");
    }
    let min_score = args.min_score.unwrap_or(config.retrieval.min_score);
    if !(0.0..=1.0).contains(&min_score) {
        anyhow::bail!("min_score must be between 0.0 and 1.0");
    }

    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let synthesizer = Arc::new(HttpSynthesizer::new(&config.synthesis)?);

    // A missing index file opens as an empty index; the router then answers
    // through the fallback tool rather than erroring.
    let index = VectorIndex::open_or_create(
        config.index_path()?,
        embedder.model_id(),
        embedder.dimension(),
    )
    .context("failed to open vector index")?;

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Index chunks: {}", index.size());
        eprintln!("  Top-k: {top_k}");
        eprintln!("  Min score: {min_score:.3}");
    }

    let router = Router::with_default_tools(
        Retriever::new(embedder),
        synthesizer,
        RetrievalConfig { top_k, min_score },
        config.router,
    );

    let result = router.route(&index, query).await;

    if verbose {
        eprintln!("  Tool: {}", result.tool);
        eprintln!("  Total: {}ms", start.elapsed().as_millis());
        eprintln!();
    }

    print!("{}", formatter.format_route_result(&result));
    Ok(())
}
