//! CLI error type and exit-code mapping.

use std::path::PathBuf;

use fdl_core::{ConfigError, DownloadError, PhaseError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The download itself failed.
    #[error("{}", .0.user_message())]
    Download(#[from] DownloadError),

    /// Argument error not caught by the parser.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Terminal I/O error.
    #[error("IO error: {0}")]
    Io(String),

    /// The session refused a control request.
    #[error("Control error: {0}")]
    Control(#[from] PhaseError),

    /// The user declined to overwrite an existing file.
    #[error("Not overwriting {}", .0.display())]
    Declined(PathBuf),

    /// Ctrl+C paused the transfer; the partial file is kept.
    #[error("Interrupted; run the same command again to resume")]
    Interrupted,
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// Codes follow sysexits.h where a category fits:
    /// - 1: General error (file too large, declined overwrite)
    /// - 2: Usage (invalid URL, web page, bad arguments)
    /// - 65: Data error (extraction failed)
    /// - 69: Service unavailable (unreachable, probe, network)
    /// - 70: Internal software error (mux failed)
    /// - 74: I/O error (disk write)
    /// - 78: Configuration error
    /// - 130: Interrupted or cancelled
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Download(err) => match err {
                DownloadError::InvalidUrl { .. } | DownloadError::WebPage { .. } => 2,
                DownloadError::UnreachableUrl { .. }
                | DownloadError::Probe { .. }
                | DownloadError::Network { .. } => 69,
                DownloadError::DiskWrite { .. } => 74,
                DownloadError::Extraction { .. } => 65,
                DownloadError::Mux { .. } => 70,
                DownloadError::FileTooLarge { .. } => 1,
                DownloadError::Cancelled => 130,
            },
            Self::Arguments(_) => 2,
            Self::Config(_) => 78,
            Self::Io(_) => 74,
            Self::Control(_) | Self::Declined(_) => 1,
            Self::Interrupted => 130,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
