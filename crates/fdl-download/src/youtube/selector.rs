//! User-facing quality names and their yt-dlp format selectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Requested stream quality.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Best video plus best audio.
    #[default]
    Best,
    /// Smallest available streams.
    Worst,
    /// Best video no taller than the given height, plus best audio.
    MaxHeight(u32),
    /// Best audio-only stream.
    Audio,
    /// A raw format id or selector passed through unchanged.
    Format(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid quality '{0}': expected best, worst, audio, <N>p or a format id")]
pub struct QualityParseError(pub String);

impl FromStr for Quality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(QualityParseError(s.to_string()));
        }

        let lower = value.to_ascii_lowercase();
        match lower.as_str() {
            "best" => return Ok(Self::Best),
            "worst" => return Ok(Self::Worst),
            "audio" | "audio-only" | "bestaudio" => return Ok(Self::Audio),
            _ => {}
        }

        if let Some(height) = lower.strip_suffix('p').and_then(|h| h.parse::<u32>().ok()) {
            if height == 0 {
                return Err(QualityParseError(s.to_string()));
            }
            return Ok(Self::MaxHeight(height));
        }

        // Labels from the quality list look like "18 - 360p medium mp4".
        let id = value.split_whitespace().next().unwrap_or(value);
        Ok(Self::Format(id.to_string()))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => f.write_str("best"),
            Self::Worst => f.write_str("worst"),
            Self::MaxHeight(h) => write!(f, "{h}p"),
            Self::Audio => f.write_str("audio"),
            Self::Format(id) => f.write_str(id),
        }
    }
}

impl Quality {
    /// The `-f` argument for yt-dlp.
    ///
    /// Without ffmpeg nothing can be merged, so only pre-muxed single-file
    /// formats are requested.
    #[must_use]
    pub fn format_selector(&self, can_merge: bool) -> String {
        match (self, can_merge) {
            (Self::Best, true) => "bv*+ba/b".to_string(),
            (Self::Best, false) => "b".to_string(),
            (Self::Worst, true) => "wv*+wa/w".to_string(),
            (Self::Worst, false) => "w".to_string(),
            (Self::MaxHeight(h), true) => format!("bv*[height<={h}]+ba/b[height<={h}]/bv*+ba/b"),
            (Self::MaxHeight(h), false) => format!("b[height<={h}]/b"),
            (Self::Audio, _) => "ba/b".to_string(),
            (Self::Format(id), _) => id.clone(),
        }
    }
}
