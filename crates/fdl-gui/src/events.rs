//! Events pushed to the GUI and the task that produces them.
//!
//! One forwarder task per session reads the session channel, derives
//! speed/ETA, throttles byte updates and hands the result to the adapter's
//! [`GuiEventSink`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use fdl_core::{DownloadError, SessionPhase, TransferStatus};
use fdl_download::progress::{
    ProgressReporter, ProgressSnapshot, ProgressThrottle, format_bytes, format_eta, format_speed,
};
use fdl_download::{SessionEvent, SessionId, SessionOutcome, TransferOutcome};

use crate::registry::SessionRegistry;

/// Event payloads for the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuiEvent {
    Phase {
        id: SessionId,
        phase: SessionPhase,
    },
    Progress {
        id: SessionId,
        status: TransferStatus,
        #[serde(flatten)]
        snapshot: ProgressSnapshot,
        /// `45.0% - 1.20 MB/s - ETA 1m 5s`
        text: String,
    },
    Completed {
        id: SessionId,
        path: PathBuf,
        folder: Option<PathBuf>,
        already_complete: bool,
    },
    Failed {
        id: SessionId,
        code: &'static str,
        message: String,
        /// Starting again with resume can finish the file.
        recoverable: bool,
    },
    Cancelled {
        id: SessionId,
    },
}

impl GuiEvent {
    /// Event channel name used by every adapter.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Phase { .. } => "download:phase",
            Self::Progress { .. } => "download:progress",
            Self::Completed { .. } => "download:completed",
            Self::Failed { .. } => "download:failed",
            Self::Cancelled { .. } => "download:cancelled",
        }
    }

    pub const fn session_id(&self) -> SessionId {
        match self {
            Self::Phase { id, .. }
            | Self::Progress { id, .. }
            | Self::Completed { id, .. }
            | Self::Failed { id, .. }
            | Self::Cancelled { id } => *id,
        }
    }

    fn finished(id: SessionId, result: Result<SessionOutcome, DownloadError>) -> Self {
        match result {
            Ok(outcome) => {
                let path = outcome.path().to_path_buf();
                Self::Completed {
                    id,
                    folder: path.parent().map(std::path::Path::to_path_buf),
                    path,
                    already_complete: matches!(
                        outcome,
                        SessionOutcome::File(TransferOutcome::AlreadyComplete { .. })
                    ),
                }
            }
            Err(DownloadError::Cancelled) => Self::Cancelled { id },
            Err(err) => Self::Failed {
                id,
                code: err.code(),
                message: err.user_message(),
                recoverable: err.is_recoverable(),
            },
        }
    }
}

/// Adapter-provided delivery of [`GuiEvent`]s (Tauri `emit`, tests...).
pub trait GuiEventSink: Send + Sync {
    /// Must not block.
    fn emit(&self, event: GuiEvent);
}

/// One-line progress text for the status label.
pub fn progress_text(snapshot: &ProgressSnapshot) -> String {
    let amount = snapshot
        .percent
        .map_or_else(|| format_bytes(snapshot.bytes), |pct| format!("{pct:.1}%"));
    format!(
        "{amount} - {} - ETA {}",
        format_speed(snapshot.speed),
        format_eta(snapshot.eta)
    )
}

/// Drain one session's events into `sink` until the session ends.
pub(crate) async fn forward_events(
    id: SessionId,
    mut events: UnboundedReceiver<SessionEvent>,
    sink: Arc<dyn GuiEventSink>,
    registry: Arc<SessionRegistry>,
    speed_window: Duration,
) {
    let mut reporter = ProgressReporter::new(speed_window);
    let mut throttle = ProgressThrottle::default();

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Phase(phase) => sink.emit(GuiEvent::Phase { id, phase }),
            SessionEvent::Progress(state) => {
                let snapshot = reporter.observe(state.bytes_written, state.total);
                if throttle.admit(&state) {
                    sink.emit(GuiEvent::Progress {
                        id,
                        status: state.status,
                        text: progress_text(&snapshot),
                        snapshot,
                    });
                }
            }
            SessionEvent::Finished(result) => {
                if let Ok(outcome) = &result {
                    registry.mark_finished(id, outcome.path());
                }
                sink.emit(GuiEvent::finished(id, result));
            }
        }
    }
    debug!(session = %id, "Event forwarder finished");
}
