//! Parsing of yt-dlp stdout.
//!
//! The tool is launched with
//! `--progress-template "download:FDL_PROGRESS %(progress)j"` and
//! `--print after_move:filepath`, so stdout carries two kinds of lines:
//!
//! ```text
//! FDL_PROGRESS {"status": "downloading", "downloaded_bytes": 1024, "total_bytes": 4096, ...}
//! /home/user/Videos/Some title.mp4
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// Marker in front of every progress line.
pub const PROGRESS_PREFIX: &str = "FDL_PROGRESS ";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// One parsed stdout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEvent {
    /// Progress of one stream (video, audio or a single file).
    Progress(StreamProgress),
    /// A line without the progress marker: the final file path.
    FinalPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamProgress {
    /// yt-dlp's status: `downloading`, `finished` or `error`.
    pub status: String,
    /// Output filename of this stream.
    pub filename: Option<String>,
    /// The `.part` file while downloading.
    pub tmpfilename: Option<String>,
    pub downloaded: u64,
    /// Exact size, or the tool's estimate.
    pub total: Option<u64>,
}

impl StreamProgress {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == "finished"
    }
}

#[derive(Deserialize)]
struct RawProgress {
    status: Option<String>,
    filename: Option<String>,
    tmpfilename: Option<String>,
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
}

/// Parse one stdout line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ToolEvent>, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some(json) = line.strip_prefix(PROGRESS_PREFIX) else {
        return Ok(Some(ToolEvent::FinalPath(line.trim().to_string())));
    };

    let raw: RawProgress = serde_json::from_str(json)?;
    let total = raw
        .total_bytes
        .or(raw.total_bytes_estimate)
        .and_then(to_bytes)
        .filter(|t| *t > 0);
    let downloaded = raw.downloaded_bytes.and_then(to_bytes).unwrap_or(0);
    let status = raw.status.unwrap_or_else(|| "downloading".to_string());

    // A finished stream without a byte count is as big as its total.
    let downloaded = if status == "finished" && downloaded == 0 {
        total.unwrap_or(0)
    } else {
        downloaded
    };

    Ok(Some(ToolEvent::Progress(StreamProgress {
        status,
        filename: raw.filename,
        tmpfilename: raw.tmpfilename,
        downloaded,
        total,
    })))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_bytes(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

/// Sums progress across the separate video and audio downloads of one job.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    streams: HashMap<String, (u64, Option<u64>)>,
    order: Vec<String>,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stream update and return the combined `(downloaded, total)`.
    ///
    /// The total is only known once every stream seen so far reports one.
    pub fn update(&mut self, progress: &StreamProgress) -> (u64, Option<u64>) {
        let key = progress.filename.clone().unwrap_or_default();
        if !self.streams.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.streams
            .insert(key, (progress.downloaded, progress.total));
        self.combined()
    }

    /// Combined `(downloaded, total)` over all streams.
    #[must_use]
    pub fn combined(&self) -> (u64, Option<u64>) {
        let downloaded = self.streams.values().map(|(d, _)| *d).sum();
        let total = self
            .streams
            .values()
            .map(|(_, t)| *t)
            .sum::<Option<u64>>();
        (downloaded, total)
    }

    /// Number of distinct streams seen.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.order.len()
    }
}
