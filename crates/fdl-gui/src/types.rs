//! Request types shared by GUI adapters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

/// What the download form submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadRequest {
    pub url: String,
    /// YouTube toggle; YouTube links are detected even when it is off.
    #[serde(default)]
    pub youtube: bool,
    /// Quality selector value (`best`, `720p`, a format id...).
    #[serde(default)]
    pub quality: Option<String>,
    /// Destination file or folder.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub resume: bool,
}

impl StartDownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            youtube: false,
            quality: None,
            output: None,
            resume: true,
        }
    }
}
