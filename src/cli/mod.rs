//! Command-line interface for RAG One.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about your local documents using a local LLM.
#[derive(Debug, Parser)]
#[command(name = "rag-one")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load documents and (re)build the vector index
    Index(commands::IndexArgs),

    /// Ask a question, or start an interactive session
    Query(commands::QueryArgs),

    /// Show configuration and index status
    Info(commands::InfoArgs),

    /// Run the web chat
    Serve(commands::ServeArgs),
}

impl Commands {
    /// Long-running commands log at info level by default.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Commands::Serve(_))
    }
}

// FromStr is implemented in models::search
