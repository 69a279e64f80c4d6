//! `fdl check-deps`: report the external tools YouTube downloads rely on.
//!
//! Plain HTTP downloads need neither tool, so a missing tool is reported
//! but never fails the command.

use fdl_core::DownloaderConfig;
use fdl_download::youtube::{ToolStatus, check_tools};

use crate::error::CliError;

// ANSI color codes for better UX
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const YTDLP_HINT: &str =
    "YouTube downloads need yt-dlp: https://github.com/yt-dlp/yt-dlp#installation";
const FFMPEG_HINT: &str =
    "Without ffmpeg only pre-merged formats can be downloaded: https://ffmpeg.org/download.html";

/// Execute the check-deps command.
pub async fn execute(config: &DownloaderConfig) -> Result<(), CliError> {
    println!("{BOLD}Checking external tools...{RESET}\n");

    let tools = check_tools(config).await;

    println!("{BOLD}{:<10} {:<10} DETAILS{RESET}", "TOOL", "STATUS");
    println!("{}", "=".repeat(60));
    for tool in &tools {
        println!("{}", status_line(tool));
    }
    println!();

    for hint in hints(&tools) {
        println!("{YELLOW}{hint}{RESET}");
    }
    Ok(())
}

fn status_line(tool: &ToolStatus) -> String {
    match &tool.path {
        Some(path) => {
            let detail = tool.version.as_deref().map_or_else(
                || path.display().to_string(),
                |v| format!("{v} ({})", path.display()),
            );
            format!("{:<10} {GREEN}{:<10}{RESET} {detail}", tool.name, "found")
        }
        None => format!("{:<10} {RED}{:<10}{RESET} not on PATH", tool.name, "missing"),
    }
}

fn hints(tools: &[ToolStatus]) -> Vec<&'static str> {
    tools
        .iter()
        .filter(|t| !t.is_available())
        .filter_map(|t| match t.name {
            "yt-dlp" => Some(YTDLP_HINT),
            "ffmpeg" => Some(FFMPEG_HINT),
            _ => None,
        })
        .collect()
}
