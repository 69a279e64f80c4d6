//! Error taxonomy for every download stage.
//!
//! Validation errors (`InvalidUrl`, `UnreachableUrl`, `WebPage`) happen before
//! any file is touched. Transport and disk failures keep their details as
//! plain strings so the enum stays `Clone` and serializable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a download did not finish.
///
/// Crosses the Tauri bridge as JSON tagged by `type`.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadError {
    /// The URL is malformed or uses an unsupported scheme.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The URL is well-formed but the resource could not be reached.
    #[error("Unreachable URL '{url}': {reason}")]
    UnreachableUrl {
        /// The URL that was probed.
        url: String,
        /// Network failure or status description.
        reason: String,
        /// HTTP status code if the server answered.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// The metadata probe failed at the network level.
    #[error("Probe failed: {message}")]
    Probe {
        message: String,
    },

    /// The URL points to a web page rather than a downloadable file.
    #[error("URL points to a web page ({content_type}), not a downloadable file")]
    WebPage {
        /// The content type reported by the server.
        content_type: String,
    },

    /// The remote resource exceeds the configured size cap.
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge {
        /// Size reported by the server.
        size: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// Network/HTTP error during the transfer.
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Set when the server answered with an error status mid-transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// Writing the partial or final file failed.
    #[error("Disk write error ({kind}): {message}")]
    DiskWrite {
        /// `std::io::ErrorKind` name, e.g. `StorageFull`.
        kind: String,
        message: String,
    },

    /// The extraction tool could not resolve a playable stream.
    #[error("Extraction failed: {message}")]
    Extraction {
        /// Last `ERROR:` line from yt-dlp.
        message: String,
    },

    /// Combining audio and video streams failed.
    #[error("Mux failed: {message}")]
    Mux {
        message: String,
    },

    /// Stopped through the session controller; the partial file is gone.
    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an unreachable URL error.
    pub fn unreachable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnreachableUrl {
            url: url.into(),
            reason: reason.into(),
            status_code: None,
        }
    }

    /// Create an unreachable URL error carrying the HTTP status.
    pub fn unreachable_with_status(url: impl Into<String>, status_code: u16) -> Self {
        Self::UnreachableUrl {
            url: url.into(),
            reason: format!("server answered HTTP {status_code}"),
            status_code: Some(status_code),
        }
    }

    /// Create a probe error.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    /// Create a web page rejection.
    pub fn web_page(content_type: impl Into<String>) -> Self {
        Self::WebPage {
            content_type: content_type.into(),
        }
    }

    /// Create a file too large error.
    #[must_use]
    pub const fn file_too_large(size: u64, limit: u64) -> Self {
        Self::FileTooLarge { size, limit }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a network error with HTTP status code.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Capture an I/O failure as `DiskWrite`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::DiskWrite {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Create a mux error.
    pub fn mux(message: impl Into<String>) -> Self {
        Self::Mux {
            message: message.into(),
        }
    }

    /// Whether re-invoking with resume can finish the job.
    ///
    /// Only a dropped connection qualifies; the partial file is left intact.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Errors raised before any I/O took place.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::UnreachableUrl { .. } | Self::WebPage { .. }
        )
    }

    /// Short machine-friendly name of the variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::UnreachableUrl { .. } => "unreachable_url",
            Self::Probe { .. } => "probe_error",
            Self::WebPage { .. } => "web_page",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::Network { .. } => "network_error",
            Self::DiskWrite { .. } => "disk_write_error",
            Self::Extraction { .. } => "extraction_error",
            Self::Mux { .. } => "mux_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl { url, reason } => {
                format!("'{url}' is not a valid download URL ({reason}).")
            }
            Self::UnreachableUrl {
                url,
                status_code: Some(code),
                ..
            } => format!("Could not reach {url}: the server answered HTTP {code}."),
            Self::UnreachableUrl { url, reason, .. } => format!("Could not reach {url}: {reason}"),
            Self::Probe { message } => format!("Could not read file information: {message}"),
            Self::WebPage { .. } => {
                "The URL points to a web page, not a downloadable file.".to_string()
            }
            Self::FileTooLarge { size, limit } => {
                format!("File is too large ({size} bytes, limit is {limit} bytes).")
            }
            Self::Network {
                message,
                status_code: Some(code),
            } => format!(
                "Network error (HTTP {code}): {message}. Run again with resume to continue."
            ),
            Self::Network { message, .. } => {
                format!("Network error: {message}. Run again with resume to continue.")
            }
            Self::DiskWrite { message, .. } => format!("Could not write file: {message}"),
            Self::Extraction { message } => format!("Could not extract video: {message}"),
            Self::Mux { message } => format!(
                "Could not combine audio and video: {message}. Is ffmpeg installed?"
            ),
            Self::Cancelled => "Download was cancelled.".to_string(),
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_becomes_disk_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let err = DownloadError::from_io_error(&io_err);

        match err {
            DownloadError::DiskWrite { kind, message } => {
                assert_eq!(kind, "PermissionDenied");
                assert!(message.contains("read-only fs"));
            }
            _ => panic!("Expected DiskWrite variant"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let err = DownloadError::network_with_status("connection reset", 502);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("502"));
        assert!(json.contains("network"));

        let parsed: DownloadError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_only_network_errors_are_recoverable() {
        assert!(DownloadError::network("reset").is_recoverable());
        assert!(!DownloadError::file_too_large(2, 1).is_recoverable());
        assert!(!DownloadError::from_io_error(&std::io::Error::other("disk full")).is_recoverable());
        assert!(!DownloadError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_validation_errors() {
        assert!(DownloadError::invalid_url("x", "no scheme").is_validation());
        assert!(DownloadError::unreachable_with_status("http://a", 404).is_validation());
        assert!(DownloadError::web_page("text/html").is_validation());
        assert!(!DownloadError::probe("timeout").is_validation());
    }

    #[test]
    fn test_user_messages() {
        let err = DownloadError::unreachable_with_status("http://example.com/x", 404);
        assert!(err.user_message().contains("404"));

        let err = DownloadError::mux("ffmpeg exited with 1");
        assert!(err.user_message().contains("ffmpeg"));
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            DownloadError::invalid_url("", "").code(),
            DownloadError::unreachable("", "").code(),
            DownloadError::probe("").code(),
            DownloadError::web_page("").code(),
            DownloadError::file_too_large(0, 0).code(),
            DownloadError::network("").code(),
            DownloadError::from_io_error(&std::io::Error::other("")).code(),
            DownloadError::extraction("").code(),
            DownloadError::mux("").code(),
            DownloadError::Cancelled.code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
