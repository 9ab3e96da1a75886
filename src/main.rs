//! CLI entry point for the fetcher tool.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fetcher_core::download::constants::CONNECT_TIMEOUT_SECS;
use fetcher_core::download::ClientConfig;
use fetcher_core::{HttpClient, Transfer, TransferCallbacks, TransferOutcome, TransferSpec};
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod progress;

use app_config::FileConfig;
use cli::Args;

/// Exit code reported when the user cancels with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = app_config::load_file_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config file > default (info)
    let default_level = resolve_log_level(&args, &file_config);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, ?file_config, "configuration resolved");
    info!("Fetcher starting");

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| file_config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let overwrite = args
        .overwrite_choice()
        .or(file_config.overwrite)
        .unwrap_or(false);
    let client_config = ClientConfig {
        connect_timeout: Duration::from_secs(
            args.connect_timeout
                .or(file_config.connect_timeout_secs)
                .unwrap_or(CONNECT_TIMEOUT_SECS),
        ),
        read_timeout: args
            .read_timeout
            .or(file_config.read_timeout_secs)
            .map(Duration::from_secs),
    };

    let client = HttpClient::with_config(client_config).context("Failed to build HTTP client")?;
    let transfer = Arc::new(Transfer::new(
        TransferSpec::new(args.url.clone(), output_dir, overwrite),
        Arc::new(client),
    ));

    let show_progress = progress::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        progress::is_dumb_terminal(),
    );
    let bar = progress::new_progress(show_progress);
    let bar_for_hook = bar.clone();
    let callbacks = TransferCallbacks::new()
        .on_progress(move |sample| progress::apply_sample(&bar_for_hook, sample));

    let watcher = {
        let transfer = Arc::clone(&transfer);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => transfer.cancel(),
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        })
    };

    let outcome = transfer.start_with(callbacks).await?;
    watcher.abort();
    bar.finish_and_clear();

    Ok(match outcome {
        TransferOutcome::Succeeded(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        TransferOutcome::Failed(error) => {
            let kind = error.kind();
            eprintln!("error {} ({kind}): {error}", kind.code());
            ExitCode::FAILURE
        }
        TransferOutcome::Cancelled => {
            eprintln!("Download cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
    })
}

fn resolve_log_level(args: &Args, file_config: &FileConfig) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file_config
            .verbosity
            .map_or("info", app_config::VerbositySetting::level),
        1 => "debug",
        _ => "trace",
    }
}
