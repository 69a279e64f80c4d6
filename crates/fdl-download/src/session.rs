//! One download session per transfer.
//!
//! A session runs on a single tokio worker task and reports through an
//! unbounded channel of [`SessionEvent`]s. The [`SessionHandle`] is the only
//! way to steer it: pause, resume and cancel are checked against the phase
//! machine before they reach the worker.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use fdl_core::{
    DownloadError, DownloadKind, DownloadRequest, DownloadResult, DownloaderConfig, PhaseError,
    PhaseMachine, ProgressSink, SessionPhase, TransferOutcome, TransferState, TransferStatus,
};

use crate::control::TransferControl;
use crate::engine::FileEngine;
use crate::http::build_client;
use crate::prober::MetadataProber;
use crate::validator::UrlValidator;
use crate::youtube::{Quality, YouTubeAdapter};

/// Unique identifier of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the string form produced by `Display`.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a session downloads.
#[derive(Debug, Clone)]
pub enum DownloadJob {
    File(DownloadRequest),
    YouTube {
        url: String,
        quality: Quality,
        /// Output directory or yt-dlp template.
        output: Option<PathBuf>,
    },
}

impl DownloadJob {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::File(request) => request.url(),
            Self::YouTube { url, .. } => url,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DownloadKind {
        match self {
            Self::File(_) => DownloadKind::File,
            Self::YouTube { .. } => DownloadKind::YouTube,
        }
    }
}

/// Successful end of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionOutcome {
    File(TransferOutcome),
    Video { path: PathBuf },
}

impl SessionOutcome {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::File(outcome) => outcome.path(),
            Self::Video { path } => path,
        }
    }
}

/// Everything a session reports.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Phase(SessionPhase),
    Progress(TransferState),
    /// Always the last event.
    Finished(Result<SessionOutcome, DownloadError>),
}

/// Shared collaborators; cheap to clone into every worker.
#[derive(Clone)]
pub struct DownloadSession {
    validator: UrlValidator,
    prober: MetadataProber,
    engine: FileEngine,
    youtube: YouTubeAdapter,
}

impl DownloadSession {
    pub fn new(config: &DownloaderConfig) -> DownloadResult<Self> {
        let client = build_client(config)?;
        Ok(Self {
            validator: UrlValidator::with_client(client.clone(), config),
            prober: MetadataProber::with_client(client.clone(), config),
            engine: FileEngine::with_client(client, config),
            youtube: YouTubeAdapter::new(config),
        })
    }

    /// Replace the YouTube adapter (custom tool paths).
    #[must_use]
    pub fn with_youtube(mut self, youtube: YouTubeAdapter) -> Self {
        self.youtube = youtube;
        self
    }

    #[must_use]
    pub const fn youtube(&self) -> &YouTubeAdapter {
        &self.youtube
    }

    /// Spawn a worker for `job` on the current runtime.
    pub fn start(&self, job: DownloadJob) -> SessionHandle {
        let id = SessionId::new();
        let control = TransferControl::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(PhaseMachine::new());

        let reporter = Arc::new(SessionReporter {
            events: events_tx,
            phase: phase_tx,
        });

        let worker = Worker {
            session: self.clone(),
            control: control.clone(),
            reporter,
        };
        debug!(session = %id, url = job.url(), kind = ?job.kind(), "Starting session");
        tokio::spawn(worker.run(job));

        SessionHandle {
            controller: SessionController {
                id,
                control,
                phase: phase_rx,
            },
            events: events_rx,
        }
    }
}

/// Pause/resume/cancel for a running session. Cloneable.
#[derive(Debug, Clone)]
pub struct SessionController {
    id: SessionId,
    control: TransferControl,
    phase: watch::Receiver<PhaseMachine>,
}

impl SessionController {
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase.borrow().current()
    }

    /// Pause at the next chunk boundary. Only valid while transferring.
    pub fn pause(&self) -> Result<(), PhaseError> {
        self.check(SessionPhase::Paused)?;
        self.control.pause();
        Ok(())
    }

    /// Resume a paused transfer from the on-disk offset.
    ///
    /// Also withdraws a pause the worker has not acted on yet.
    pub fn resume(&self) -> Result<(), PhaseError> {
        let from = self.phase();
        if from != SessionPhase::Paused && !self.pause_pending() {
            return Err(PhaseError {
                from,
                to: SessionPhase::Transferring,
            });
        }
        self.control.resume();
        Ok(())
    }

    /// A pause was requested but the worker has not reached a chunk boundary.
    #[must_use]
    pub fn pause_pending(&self) -> bool {
        self.phase() == SessionPhase::Transferring && self.control.is_paused()
    }

    /// Cancel from any non-terminal phase; the partial file is removed.
    pub fn cancel(&self) -> Result<(), PhaseError> {
        self.check(SessionPhase::Cancelled)?;
        self.control.cancel();
        Ok(())
    }

    fn check(&self, to: SessionPhase) -> Result<(), PhaseError> {
        let from = self.phase();
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(PhaseError { from, to })
        }
    }
}

/// Owner's view of a session: controls plus the event stream.
#[derive(Debug)]
pub struct SessionHandle {
    controller: SessionController,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionHandle {
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.controller.id
    }

    #[must_use]
    pub const fn controller(&self) -> &SessionController {
        &self.controller
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.controller.phase()
    }

    pub fn pause(&self) -> Result<(), PhaseError> {
        self.controller.pause()
    }

    pub fn resume(&self) -> Result<(), PhaseError> {
        self.controller.resume()
    }

    pub fn cancel(&self) -> Result<(), PhaseError> {
        self.controller.cancel()
    }

    /// Next event, or `None` once the worker is gone.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Drain events until the session finishes.
    pub async fn wait(mut self) -> Result<SessionOutcome, DownloadError> {
        while let Some(event) = self.events.recv().await {
            if let SessionEvent::Finished(result) = event {
                return result;
            }
        }
        Err(DownloadError::Cancelled)
    }

    /// Split into the cloneable controller and the event receiver.
    #[must_use]
    pub fn into_parts(self) -> (SessionController, mpsc::UnboundedReceiver<SessionEvent>) {
        (self.controller, self.events)
    }
}

/// Worker side of the channel; also the progress sink handed to adapters.
struct SessionReporter {
    events: mpsc::UnboundedSender<SessionEvent>,
    phase: watch::Sender<PhaseMachine>,
}

impl SessionReporter {
    fn advance(&self, to: SessionPhase) -> Result<(), PhaseError> {
        let mut result = Ok(());
        let changed = self.phase.send_if_modified(|machine| {
            result = machine.transition(to).map(|_| ());
            result.is_ok()
        });
        if changed {
            let _ = self.events.send(SessionEvent::Phase(to));
        }
        result
    }

    fn current(&self) -> SessionPhase {
        self.phase.borrow().current()
    }

    fn finish(&self, result: Result<SessionOutcome, DownloadError>) {
        let terminal = match &result {
            Ok(_) => SessionPhase::Completed,
            Err(DownloadError::Cancelled) => SessionPhase::Cancelled,
            Err(_) => SessionPhase::Failed,
        };
        if let Err(e) = self.advance(terminal) {
            warn!(error = %e, "Unexpected terminal transition");
        }
        let _ = self.events.send(SessionEvent::Finished(result));
    }
}

impl ProgressSink for SessionReporter {
    fn emit(&self, state: TransferState) {
        let target = match state.status {
            TransferStatus::Active => Some(SessionPhase::Transferring),
            TransferStatus::Paused => Some(SessionPhase::Paused),
            _ => None,
        };
        if let Some(target) = target {
            if self.current() != target {
                let _ = self.advance(target);
            }
        }
        let _ = self.events.send(SessionEvent::Progress(state));
    }
}

struct Worker {
    session: DownloadSession,
    control: TransferControl,
    reporter: Arc<SessionReporter>,
}

impl Worker {
    async fn run(self, job: DownloadJob) {
        let result = self.execute(&job).await;
        match &result {
            Ok(outcome) => info!(path = %outcome.path().display(), "Session finished"),
            Err(DownloadError::Cancelled) => info!("Session cancelled"),
            Err(e) => warn!(error = %e, "Session failed"),
        }
        self.reporter.finish(result);
    }

    async fn execute(&self, job: &DownloadJob) -> Result<SessionOutcome, DownloadError> {
        self.advance(SessionPhase::Validating)?;
        self.guard(self.session.validator.validate(job.url(), job.kind()))
            .await?;

        match job {
            DownloadJob::File(request) => {
                self.advance(SessionPhase::Probing)?;
                let metadata = self.guard(self.session.prober.probe(request.url())).await?;

                self.advance(SessionPhase::Transferring)?;
                let outcome = self
                    .session
                    .engine
                    .download(request, &metadata, &self.control, self.reporter.as_ref())
                    .await?;
                Ok(SessionOutcome::File(outcome))
            }
            DownloadJob::YouTube {
                url,
                quality,
                output,
            } => {
                self.advance(SessionPhase::Transferring)?;
                let path = self
                    .session
                    .youtube
                    .download(
                        url,
                        quality,
                        output.as_deref(),
                        &self.control,
                        self.reporter.as_ref(),
                    )
                    .await?;
                Ok(SessionOutcome::Video { path })
            }
        }
    }

    /// Run a pre-transfer step, abandoning it on cancel.
    async fn guard<T>(
        &self,
        step: impl Future<Output = DownloadResult<T>>,
    ) -> DownloadResult<T> {
        let token = self.control.cancellation_token();
        tokio::select! {
            biased;
            () = token.cancelled() => Err(DownloadError::Cancelled),
            res = step => res,
        }
    }

    fn advance(&self, to: SessionPhase) -> DownloadResult<()> {
        if self.control.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        self.reporter.advance(to).map_err(|e| {
            warn!(error = %e, "Rejected phase transition");
            DownloadError::Cancelled
        })
    }
}
