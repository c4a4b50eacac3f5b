use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::{IngestStats, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{
    Embedder, HttpEmbedder, IngestReport, IngestionPipeline, TextChunker, VectorIndex,
};
use crate::sources::LocalSource;

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(
        required = true,
        help = "Directory containing PDF, text, or markdown files"
    )]
    pub path: PathBuf,

    #[arg(
        long,
        short = 'e',
        help = "Additional exclude glob patterns (relative to the directory)"
    )]
    pub exclude: Vec<String>,

    #[arg(long, help = "List the files that would be ingested without ingesting")]
    pub dry_run: bool,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    if !args.path.is_dir() {
        anyhow::bail!("not a directory: {}", args.path.display());
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start = Instant::now();

    let mut chunking = config.chunking.clone();
    chunking.exclude_patterns.extend(args.exclude.clone());

    let source = LocalSource::new(&args.path, &chunking)?;
    let discovered = source
        .discover()
        .await
        .with_context(|| format!("failed to scan {}", args.path.display()))?;

    if discovered.documents.is_empty() && discovered.failed.is_empty() {
        println!(
            "{}",
            formatter.format_message("No supported documents found.")
        );
        return Ok(());
    }

    if args.dry_run {
        println!(
            "{}",
            formatter.format_message(&format!(
                "Dry run: would ingest {} documents",
                discovered.documents.len()
            ))
        );
        for document in &discovered.documents {
            println!("  {}", document.source_id);
        }
        return Ok(());
    }

    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let mut index = VectorIndex::open_or_create(
        config.index_path()?,
        embedder.model_id(),
        embedder.dimension(),
    )
    .context("failed to open vector index")?;

    let chunker = TextChunker::new(&chunking);
    let pipeline = IngestionPipeline::new(
        embedder,
        chunker,
        config.embedding.batch_size as usize,
    );

    let mut stats = IngestStats {
        files_discovered: (discovered.documents.len() + discovered.failed.len()) as u64,
        documents_loaded: discovered.documents.len() as u64,
        ..Default::default()
    };
    for failure in &discovered.failed {
        stats
            .failures
            .push((failure.path.display().to_string(), failure.reason.clone()));
    }

    let pb = ProgressBar::new(discovered.documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap()
            .progress_chars("#>-"),
    );

    for document in discovered.documents {
        let source_id = document.source_id.clone();
        let report = pipeline.ingest(&mut index, vec![document]).await;
        pb.inc(1);

        let before = stats.failures.len();
        let clean = apply_report(&mut stats, report);
        if verbose {
            if clean {
                pb.println(format!("Ingested {}", source_id));
            } else {
                for (source_id, reason) in &stats.failures[before..] {
                    pb.println(format!("Failed {}: {}", source_id, reason));
                }
            }
        }
    }
    pb.finish_and_clear();

    stats.duration_ms = start.elapsed().as_millis() as u64;
    print!("{}", formatter.format_ingest_stats(&stats));

    if !stats.failures.is_empty() {
        anyhow::bail!("{} of {} files failed", stats.failures.len(), stats.files_discovered);
    }

    Ok(())
}

/// Fold one document's report into the running stats. Returns whether the
/// report was failure-free.
fn apply_report(stats: &mut IngestStats, report: IngestReport) -> bool {
    stats.chunks_added += report.added as u64;
    stats.chunks_skipped += report.skipped as u64;
    let clean = report.is_clean();
    for failure in report.failed {
        stats.failures.push((failure.source_id, failure.reason));
    }
    clean
}
