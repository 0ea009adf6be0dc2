use anyhow::{Context, Result};
use clap::Args;

use crate::models::Config;
use crate::server::{run_server, shutdown_signal};
use crate::services::RagEngine;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (defaults to WEB_BIND)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,
}

pub async fn handle_serve(args: ServeArgs, config: &Config) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.web.bind.clone());
    let engine = RagEngine::from_config(config).context("failed to initialize the pipeline")?;

    match engine.index().stats() {
        Ok(Some(stats)) if !stats.is_empty() => tracing::info!(
            "Index ready: {} chunks from {} documents",
            stats.entries,
            stats.documents
        ),
        Ok(_) => tracing::warn!("No index found; run `rag-one index` before asking questions"),
        Err(e) => tracing::warn!("Index unreadable: {}", e),
    }

    run_server(engine, &bind, shutdown_signal())
        .await
        .with_context(|| format!("web server failed on {}", bind))
}
