//! Semantic error types for GUI operations.
//!
//! Adapters map `GuiError` to whatever their toolkit expects (the Tauri shell
//! turns it into a string for the frontend).

use std::fmt;

use serde::Serialize;

use fdl_core::{DownloadError, PhaseError};
use fdl_download::youtube::QualityParseError;

/// Semantic errors for GUI backend operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GuiError {
    /// No session with this id.
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// The request itself is wrong (bad URL, bad quality).
    ValidationFailed(String),

    /// Operation conflicts with the session's current phase.
    Conflict(String),

    /// A required external tool is missing.
    Unavailable(String),

    Internal(String),
}

impl fmt::Display for GuiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GuiError {}

impl From<DownloadError> for GuiError {
    fn from(err: DownloadError) -> Self {
        if err.is_validation() {
            return Self::ValidationFailed(err.user_message());
        }
        match err {
            DownloadError::Cancelled => Self::Conflict("download cancelled".to_string()),
            DownloadError::Extraction { .. } => Self::Unavailable(err.user_message()),
            _ => Self::Internal(err.user_message()),
        }
    }
}

impl From<PhaseError> for GuiError {
    fn from(err: PhaseError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<QualityParseError> for GuiError {
    fn from(err: QualityParseError) -> Self {
        Self::ValidationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use fdl_core::SessionPhase;

    use super::*;

    #[test]
    fn test_validation_errors_map_to_validation_failed() {
        let err = GuiError::from(DownloadError::invalid_url("x", "bad"));
        assert!(matches!(err, GuiError::ValidationFailed(_)));
        let err = GuiError::from(DownloadError::web_page("text/html"));
        assert!(matches!(err, GuiError::ValidationFailed(_)));
    }

    #[test]
    fn test_phase_error_is_conflict() {
        let err = GuiError::from(PhaseError {
            from: SessionPhase::Completed,
            to: SessionPhase::Paused,
        });
        assert!(matches!(err, GuiError::Conflict(_)));
    }

    #[test]
    fn test_display() {
        let err = GuiError::NotFound {
            entity: "download",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "download not found: abc");
    }
}
