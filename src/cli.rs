//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Stream a single remote resource to disk.
///
/// Fetcher downloads one HTTP/HTTPS URL into a directory, shows progress, and
/// can be cancelled with Ctrl-C without leaving a partial file behind.
#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the resource to download (http or https)
    pub url: String,

    /// Directory to save into (created if missing; default: current directory)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Replace an existing file with the same name instead of saving as name(1).ext
    #[arg(long, overrides_with = "no_overwrite")]
    pub overwrite: bool,

    /// Keep existing files and save as name(1).ext, even if the config file enables overwrite
    #[arg(long, overrides_with = "overwrite")]
    pub no_overwrite: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Idle read timeout in seconds (1-86400; default: none)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pub read_timeout: Option<u64>,

    /// Path to a config file (default: ~/.config/fetcher/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// The overwrite choice made on the command line, if any.
    ///
    /// When both flags are given the last one wins.
    #[must_use]
    pub fn overwrite_choice(&self) -> Option<bool> {
        match (self.overwrite, self.no_overwrite) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
