//! Subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use fdl_download::youtube::Quality;

#[derive(Subcommand)]
pub enum Commands {
    /// Download a file over HTTP(S), or a YouTube video
    Download(DownloadArgs),

    /// Check that yt-dlp and ffmpeg are installed
    CheckDeps,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// URL to download
    pub url: String,

    /// Output file or directory (YouTube: directory or yt-dlp template)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Treat the URL as a YouTube video (detected automatically for YouTube links)
    #[arg(long)]
    pub youtube: bool,

    /// Start over instead of resuming a partial download
    #[arg(long)]
    pub no_resume: bool,

    /// YouTube quality: best, worst, audio, <N>p or a format id
    #[arg(short, long, default_value = "best")]
    pub quality: Quality,

    /// Refuse files larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    pub max_size: Option<u64>,

    /// Overwrite an existing destination without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// List the qualities a YouTube video offers and exit
    #[arg(long)]
    pub list_qualities: bool,
}
