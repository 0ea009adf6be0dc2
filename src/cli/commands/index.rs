//! Index command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::{FileList, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::RagEngine;
use crate::sources::DocumentLoader;

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Documents directory (defaults to DOCUMENTS_PATH)
    #[arg(long, short = 'd')]
    pub documents_path: Option<PathBuf>,

    /// Show what would be indexed without actually indexing
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_index(
    args: IndexArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);
    let documents_path = args
        .documents_path
        .unwrap_or_else(|| config.indexing.documents_path.clone());

    if args.dry_run {
        let list = dry_run(config, documents_path)?;
        print!("{}", formatter.format_file_list(&list));
        return Ok(());
    }

    if verbose {
        eprintln!("Documents path: {}", documents_path.display());
        eprintln!("Index path:     {}", config.indexing.index_path.display());
        eprintln!(
            "Embeddings:     {} ({})",
            config.embedding.model_id, config.embedding.backend
        );
        eprintln!(
            "Chunking:       {} chars, {} overlap",
            config.indexing.chunk_size, config.indexing.chunk_overlap
        );
    }

    let engine = RagEngine::from_config(config).context("failed to initialize the pipeline")?;

    let pb = progress_bar();
    let result = engine.build_index(&documents_path, &pb).await;
    pb.finish_and_clear();

    let report = result?;
    print!("{}", formatter.format_index_report(&report));

    Ok(())
}

fn dry_run(config: &Config, documents_path: PathBuf) -> Result<FileList> {
    let loader = DocumentLoader::from_config(&config.indexing);
    let (files, unsupported_files) = loader.collect_files(&documents_path)?;
    Ok(FileList {
        documents_path,
        files: files.into_iter().map(|(path, _)| path).collect(),
        unsupported_files,
    })
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
