use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgGroup, Args};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::cli::output::{Formatter, get_formatter};
use crate::error::{QueryError, remediation_hint};
use crate::models::{Config, OutputFormat, QueryResult};
use crate::services::RagEngine;

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["question", "interactive"])))]
pub struct QueryArgs {
    /// Question to ask
    #[arg(long, short = 'q')]
    pub question: Option<String>,

    /// Read questions from the terminal until quit/exit/q
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Generation model (overrides OLLAMA_MODEL)
    #[arg(long, short = 'm', alias = "ollama-model")]
    pub model: Option<String>,

    /// Generation service URL (overrides OLLAMA_BASE_URL)
    #[arg(long, alias = "ollama-url")]
    pub service_url: Option<String>,

    /// Number of chunks to retrieve
    #[arg(long, short = 'k')]
    pub top_k: Option<u32>,
}

pub async fn handle_query(
    args: QueryArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let mut config = config
        .clone()
        .with_generation_overrides(args.model, args.service_url);
    if let Some(top_k) = args.top_k {
        config.retrieval.top_k = top_k;
    }
    config.validate()?;

    if verbose {
        eprintln!("Ollama URL:   {}", config.generation.url);
        eprintln!("Ollama model: {}", config.generation.model);
        eprintln!("Top-K:        {}", config.retrieval.top_k);
    }

    let formatter = get_formatter(format);
    let engine = RagEngine::from_config(&config)?;
    let show_spinner = console::Term::stdout().is_term();

    if args.interactive {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        run_interactive(&engine, formatter.as_ref(), stdin, &mut stdout, show_spinner).await?;
        return Ok(());
    }

    let question = args.question.unwrap_or_default();
    let result = ask(&engine, &question, show_spinner).await?;
    if verbose {
        eprintln!("Answered in {}ms", result.duration_ms);
    }
    print!("{}", formatter.format_answer(&result));
    Ok(())
}

/// Read questions line by line until an exit word or end of input.
/// A failed question is reported and the loop continues.
/// Returns the number of questions asked.
pub async fn run_interactive<R, W>(
    engine: &RagEngine,
    formatter: &dyn Formatter,
    input: R,
    output: &mut W,
    show_spinner: bool,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(output, "Interactive mode. Type your questions (or 'quit' to exit).\n")?;

    let mut lines = input.lines();
    let mut asked = 0;

    loop {
        write!(output, "You: ")?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(output)?;
            break;
        };
        let question = line.trim();

        if EXIT_WORDS.iter().any(|w| question.eq_ignore_ascii_case(w)) {
            writeln!(output, "Goodbye!")?;
            break;
        }
        if question.is_empty() {
            continue;
        }

        asked += 1;
        match ask(engine, question, show_spinner).await {
            Ok(result) => {
                writeln!(output)?;
                write!(output, "{}", formatter.format_answer(&result))?;
                writeln!(output)?;
            }
            Err(e) => {
                write!(output, "{}", formatter.format_error(&e.to_string()))?;
                let err = anyhow::Error::new(e);
                if let Some(hint) = remediation_hint(&err) {
                    writeln!(output, "Hint: {}", hint)?;
                }
                writeln!(output)?;
            }
        }
    }

    Ok(asked)
}

async fn ask(
    engine: &RagEngine,
    question: &str,
    show_spinner: bool,
) -> Result<QueryResult, QueryError> {
    let spinner = if show_spinner {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Thinking...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    } else {
        ProgressBar::hidden()
    };

    let result = engine.query(question).await;
    spinner.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::TextFormatter;
    use crate::services::{OllamaClient, RagEngine};
    use crate::test_support::{
        FakeEmbedder, StubBehavior, refused_url, spawn_generation_stub, test_config,
    };

    async fn indexed_engine(generation_url: &str, store: &std::path::Path) -> RagEngine {
        let config = test_config(generation_url, store);
        let generator = OllamaClient::new(&config.generation).unwrap();
        let engine = RagEngine::new(config, Box::new(FakeEmbedder::new()), Box::new(generator));

        let docs = tempfile::tempdir().unwrap();
        std::fs::write(docs.path().join("notes.txt"), "Tea is brewed with hot water.").unwrap();
        engine
            .build_index(docs.path(), &ProgressBar::hidden())
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn test_interactive_stops_at_exit_word() {
        let store = tempfile::tempdir().unwrap();
        let stub = spawn_generation_stub(StubBehavior::Answer("Use hot water.".into())).await;
        let engine = indexed_engine(&stub.url, store.path()).await;

        let input: &[u8] = b"How is tea brewed?\n\n   \nQuit\nnever asked\n";
        let mut output = Vec::new();
        let asked = run_interactive(&engine, &TextFormatter, input, &mut output, false)
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(asked, 1);
        assert_eq!(stub.calls(), 1);
        assert!(output.contains("Use hot water."));
        assert!(output.contains("Goodbye!"));
        assert!(!output.contains("never asked"));
    }

    #[tokio::test]
    async fn test_interactive_continues_after_errors() {
        let store = tempfile::tempdir().unwrap();
        let engine = indexed_engine(&refused_url(), store.path()).await;

        let input: &[u8] = b"first?\nsecond?\n";
        let mut output = Vec::new();
        let asked = run_interactive(&engine, &TextFormatter, input, &mut output, false)
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(asked, 2);
        assert_eq!(output.matches("Error: ").count(), 2);
        assert!(output.contains("Hint: "));
    }

    #[tokio::test]
    async fn test_interactive_ends_at_eof() {
        let store = tempfile::tempdir().unwrap();
        let engine = indexed_engine(&refused_url(), store.path()).await;

        let input: &[u8] = b"";
        let mut output = Vec::new();
        let asked = run_interactive(&engine, &TextFormatter, input, &mut output, false)
            .await
            .unwrap();
        assert_eq!(asked, 0);
    }
}
