use anyhow::Result;
use clap::Args;

use crate::cli::output::{InfoReport, ServiceCheck, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{Generator, OllamaClient, VectorIndex};

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Also check that the generation service is reachable
    #[arg(long)]
    pub check: bool,
}

pub async fn handle_info(args: InfoArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let index = VectorIndex::new(config.indexing.index_path.clone());

    let (stats, index_error) = match index.stats() {
        Ok(stats) => (stats, None),
        Err(e) => (None, Some(e.to_string())),
    };

    let service = if args.check {
        let client = OllamaClient::new(&config.generation)?;
        Some(match client.health_check().await {
            Ok(()) => ServiceCheck {
                reachable: true,
                error: None,
            },
            Err(e) => ServiceCheck {
                reachable: false,
                error: Some(e.to_string()),
            },
        })
    } else {
        None
    };

    let info = InfoReport {
        config_file: Config::config_path().filter(|p| p.exists()),
        documents_path: config.indexing.documents_path.clone(),
        index_path: index.path(),
        generation_url: config.generation.url.clone(),
        generation_model: config.generation.model.clone(),
        embedding_backend: config.embedding.backend.to_string(),
        embedding_model: config.embedding.model_id.clone(),
        chunk_size: config.indexing.chunk_size,
        chunk_overlap: config.indexing.chunk_overlap,
        top_k: config.retrieval.top_k,
        index: stats,
        index_error,
        service,
    };

    print!("{}", formatter.format_info(&info));
    Ok(())
}
