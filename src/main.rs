use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use rag_one::cli::commands::{handle_index, handle_info, handle_query, handle_serve};
use rag_one::cli::output::get_formatter;
use rag_one::cli::{Cli, Commands};
use rag_one::error::remediation_hint;
use rag_one::models::{Config, OutputFormat};
use rag_one::server::shutdown_signal;

/// Detect ONNX Runtime library path and set ORT_DYLIB_PATH if not already set.
/// Must be called before any ort code runs.
fn detect_and_set_ort_path() {
    if std::env::var("ORT_DYLIB_PATH")
        .map(|p| Path::new(&p).exists())
        .unwrap_or(false)
    {
        return;
    }

    let home = std::env::var("HOME").unwrap_or_default();

    let found = if cfg!(target_os = "macos") {
        [
            format!("{home}/.local/lib/rag-one/libonnxruntime.dylib"),
            "/opt/homebrew/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
            "/usr/local/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else if cfg!(target_os = "linux") {
        [
            format!("{home}/.local/lib/rag-one/libonnxruntime.so"),
            "/usr/lib/libonnxruntime.so".into(),
            "/usr/local/lib/libonnxruntime.so".into(),
            "/usr/lib/x86_64-linux-gnu/libonnxruntime.so".into(),
            "/usr/lib/aarch64-linux-gnu/libonnxruntime.so".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else {
        None
    };

    if let Some(path) = found {
        // SAFETY: Called at program start before any threads are spawned.
        unsafe {
            std::env::set_var("ORT_DYLIB_PATH", path);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    detect_and_set_ort_path();

    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();
    let verbose = cli.verbose;
    rag_one::logging::init(verbose || cli.command.is_long_running());

    let result = match Config::load() {
        Ok(config) if cli.command.is_long_running() => {
            run_command(cli.command, &config, format, verbose).await
        }
        Ok(config) => {
            tokio::select! {
                result = run_command(cli.command, &config, format, verbose) => result,
                _ = shutdown_signal() => {
                    eprint!("\n{}", get_formatter(format).format_message("Interrupted"));
                    return ExitCode::FAILURE;
                }
            }
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", get_formatter(format).format_error(&format!("{:#}", e)));
            if let Some(hint) = remediation_hint(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run_command(
    command: Commands,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Index(args) => handle_index(args, config, format, verbose).await,
        Commands::Query(args) => handle_query(args, config, format, verbose).await,
        Commands::Info(args) => handle_info(args, config, format).await,
        Commands::Serve(args) => handle_serve(args, config).await,
    }
}
