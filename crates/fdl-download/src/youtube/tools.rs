//! Locating the external tools and reporting their versions.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use fdl_core::DownloaderConfig;

pub const YTDLP: &str = "yt-dlp";
pub const FFMPEG: &str = "ffmpeg";

/// Availability of one external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl ToolStatus {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

/// Configured path if it exists, otherwise a `PATH` lookup.
#[must_use]
pub fn locate(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        debug!(tool = name, path = %path.display(), "Configured tool path missing; searching PATH");
    }
    which::which(name).ok()
}

#[must_use]
pub fn locate_ytdlp(config: &DownloaderConfig) -> Option<PathBuf> {
    locate(YTDLP, config.ytdlp_path.as_deref())
}

#[must_use]
pub fn locate_ffmpeg(config: &DownloaderConfig) -> Option<PathBuf> {
    locate(FFMPEG, config.ffmpeg_path.as_deref())
}

/// Probe both tools.
pub async fn check_tools(config: &DownloaderConfig) -> Vec<ToolStatus> {
    let ytdlp = locate_ytdlp(config);
    let ffmpeg = locate_ffmpeg(config);

    let ytdlp_version = match &ytdlp {
        Some(path) => version_of(path, "--version").await,
        None => None,
    };
    let ffmpeg_version = match &ffmpeg {
        Some(path) => version_of(path, "-version").await,
        None => None,
    };

    vec![
        ToolStatus {
            name: YTDLP,
            path: ytdlp,
            version: ytdlp_version,
        },
        ToolStatus {
            name: FFMPEG,
            path: ffmpeg,
            version: ffmpeg_version,
        },
    ]
}

/// First line of `<tool> <flag>`.
async fn version_of(path: &Path, flag: &str) -> Option<String> {
    let output = Command::new(path)
        .arg(flag)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool() {
        assert_eq!(locate("fdl-definitely-not-a-real-binary", None), None);
    }

    #[test]
    fn test_configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("yt-dlp");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(locate(YTDLP, Some(&fake)), Some(fake));
    }

    #[test]
    fn test_status_availability() {
        let status = ToolStatus {
            name: FFMPEG,
            path: None,
            version: None,
        };
        assert!(!status.is_available());
    }
}
