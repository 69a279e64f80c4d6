//! Core domain types for downloads.
//!
//! Pure data types with no I/O dependencies.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single download job as requested by the user.
///
/// Immutable once the transfer starts; a new request is needed to restart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    url: String,
    destination: Option<PathBuf>,
    resume: bool,
}

impl DownloadRequest {
    /// Create a new request with resume enabled and no explicit destination.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination: None,
            resume: true,
        }
    }

    /// Set the destination path.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the destination path if one was given.
    #[must_use]
    pub fn with_optional_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    /// Enable or disable resuming from an existing partial file.
    #[must_use]
    pub const fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// The source URL as given by the user.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Explicit destination, if any.
    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Whether a partial file may be resumed.
    #[must_use]
    pub const fn resume(&self) -> bool {
        self.resume
    }
}

/// Size and type of a remote resource as reported by a probe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    /// Total size in bytes, if the server reported it.
    pub total_size: Option<u64>,
    /// Content type without parameters (e.g. `application/zip`), lowercased.
    pub content_type: Option<String>,
    /// Whether the server advertised `Accept-Ranges: bytes`.
    ///
    /// Informational only; the engine decides resume support from the
    /// actual range response.
    pub accepts_ranges: bool,
    /// URL after redirects.
    pub final_url: Option<String>,
}

impl RemoteMetadata {
    /// Metadata for a resource of known size.
    #[must_use]
    pub const fn with_size(total_size: u64) -> Self {
        Self {
            total_size: Some(total_size),
            content_type: None,
            accepts_ranges: false,
            final_url: None,
        }
    }

    /// Whether the content type says this is an HTML page.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct == "text/html" || ct == "application/xhtml+xml")
    }
}

/// Lifecycle status of a single transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Created but not yet started.
    Pending,
    /// Bytes are flowing.
    Active,
    /// Stopped at a chunk boundary; the partial file is the resume point.
    Paused,
    /// Stopped by the user; partial file removed.
    Cancelled,
    /// Destination file finalized.
    Completed,
    /// Stopped by an error.
    Failed,
}

impl TransferStatus {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further updates will follow.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }
}

/// Snapshot of a transfer, emitted after every chunk and on every status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferState {
    /// Bytes present in the partial (or final) file.
    pub bytes_written: u64,
    /// Total size, if known.
    pub total: Option<u64>,
    /// Current status.
    pub status: TransferStatus,
}

impl TransferState {
    /// A fresh, pending state.
    #[must_use]
    pub const fn pending(total: Option<u64>) -> Self {
        Self {
            bytes_written: 0,
            total,
            status: TransferStatus::Pending,
        }
    }

    /// Copy of this state with a new status.
    #[must_use]
    pub const fn with_status(self, status: TransferStatus) -> Self {
        Self { status, ..self }
    }

    /// Completion percentage (0.0 - 100.0) when the total is known and non-zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(0) if self.status == TransferStatus::Completed => Some(100.0),
            Some(total) if total > 0 => {
                Some((self.bytes_written.min(total) as f64 / total as f64) * 100.0)
            }
            _ => None,
        }
    }
}

/// How a successful file transfer ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Bytes were transferred and the destination finalized.
    Downloaded {
        /// Finalized file.
        path: PathBuf,
        /// Final size in bytes.
        bytes: u64,
        /// Offset the last connection resumed from (0 for a fresh transfer).
        resumed_from: u64,
    },
    /// The destination already held the complete file; nothing was fetched.
    AlreadyComplete {
        /// Existing file.
        path: PathBuf,
        /// Its size in bytes.
        bytes: u64,
    },
}

impl TransferOutcome {
    /// Path of the finished file.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Downloaded { path, .. } | Self::AlreadyComplete { path, .. } => path,
        }
    }

    /// Size of the finished file.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        match self {
            Self::Downloaded { bytes, .. } | Self::AlreadyComplete { bytes, .. } => *bytes,
        }
    }
}

/// Which adapter carries out a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    /// Direct HTTP(S) file.
    #[default]
    File,
    /// YouTube video via the extraction tool.
    YouTube,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = DownloadRequest::new("https://example.com/a.bin")
            .with_destination("/tmp/a.bin")
            .with_resume(false);
        assert_eq!(req.url(), "https://example.com/a.bin");
        assert_eq!(req.destination(), Some(Path::new("/tmp/a.bin")));
        assert!(!req.resume());
    }

    #[test]
    fn test_request_defaults_to_resume() {
        let req = DownloadRequest::new("https://example.com/a.bin");
        assert!(req.resume());
        assert!(req.destination().is_none());
    }

    #[test]
    fn test_percent_unknown_total() {
        let state = TransferState {
            bytes_written: 10,
            total: None,
            status: TransferStatus::Active,
        };
        assert!(state.percent().is_none());
    }

    #[test]
    fn test_percent_known_total() {
        let state = TransferState {
            bytes_written: 250,
            total: Some(1000),
            status: TransferStatus::Active,
        };
        assert!((state.percent().unwrap() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_file_completed_is_full() {
        let state = TransferState {
            bytes_written: 0,
            total: Some(0),
            status: TransferStatus::Completed,
        };
        assert_eq!(state.percent(), Some(100.0));
    }

    #[test]
    fn test_html_detection() {
        let mut meta = RemoteMetadata::with_size(10);
        assert!(!meta.is_html());
        meta.content_type = Some("text/html".to_string());
        assert!(meta.is_html());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(!TransferStatus::Paused.is_terminal());
        assert!(!TransferStatus::Active.is_terminal());
    }
}
