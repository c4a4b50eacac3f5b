use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{HttpEmbedder, VectorIndex};

pub async fn handle_status(format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let embedder = HttpEmbedder::new(&config.embedding)?;
    let embedding_reachable = match embedder.health_check().await {
        Ok(_) => true,
        Err(e) => {
            if verbose {
                eprintln!("Embedding health check failed: {e}");
            }
            false
        }
    };

    let index_path = config.index_path()?;
    let index_exists = VectorIndex::exists(&index_path);

    // Open under the stored tag, not the configured one: status must still
    // report an index built with a different embedder.
    let (chunks, documents, index_model, index_dimension) = if index_exists {
        let header = VectorIndex::read_header(&index_path)?;
        let index =
            VectorIndex::open_or_create(&index_path, &header.embedder_model, header.dimension)?;
        (
            index.size() as u64,
            index.document_names(),
            Some(header.embedder_model),
            Some(header.dimension),
        )
    } else {
        (0, Vec::new(), None, None)
    };

    let status = StatusInfo {
        index_path: index_path.display().to_string(),
        index_exists,
        chunks,
        documents,
        index_model,
        index_dimension,
        embedder_model: config.embedding.model.clone(),
        dimension: config.embedding.dimension as usize,
        embedding_url: config.embedding.url.clone(),
        embedding_reachable,
    };

    print!("{}", formatter.format_status(&status));
    Ok(())
}
