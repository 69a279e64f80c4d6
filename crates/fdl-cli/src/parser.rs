//! Root CLI parser and global options.

use clap::Parser;

use crate::commands::Commands;

/// Resumable HTTP and YouTube downloader.
#[derive(Parser)]
#[command(name = "fdl")]
#[command(about = "Download files over HTTP(S) with resume, or videos from YouTube")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
