//! `GuiBackend` - the GUI orchestration facade.
//!
//! The Tauri commands delegate here. One download session per transfer;
//! every session gets its own event forwarder task.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use fdl_core::utils::derive_filename;
use fdl_core::{DownloadRequest, DownloaderConfig, SessionPhase};
use fdl_download::youtube::{Quality, QualityOption, ToolStatus, YouTubeAdapter, check_tools, is_youtube_link};
use fdl_download::{DownloadJob, DownloadSession, SessionId, check_syntax};

use crate::error::GuiError;
use crate::events::{GuiEventSink, forward_events};
use crate::registry::SessionRegistry;
use crate::types::StartDownloadRequest;

const YOUTUBE_FILE_NAME: &str = "video.mp4";

/// GUI backend facade.
pub struct GuiBackend {
    config: DownloaderConfig,
    session: DownloadSession,
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn GuiEventSink>,
}

impl GuiBackend {
    pub fn new(config: DownloaderConfig, sink: Arc<dyn GuiEventSink>) -> Result<Self, GuiError> {
        config
            .validate()
            .map_err(|e| GuiError::ValidationFailed(e.to_string()))?;
        let session = DownloadSession::new(&config)?;
        Ok(Self {
            config,
            session,
            registry: Arc::new(SessionRegistry::default()),
            sink,
        })
    }

    /// Start a download and return its session id.
    ///
    /// Must be called from within a tokio runtime. Syntax errors are
    /// reported here; everything later arrives as events.
    pub fn start_download(&self, request: &StartDownloadRequest) -> Result<SessionId, GuiError> {
        check_syntax(&request.url)?;

        let job = if request.youtube || is_youtube_link(&request.url) {
            let quality = match request.quality.as_deref() {
                Some(q) if !q.trim().is_empty() => q.parse::<Quality>()?,
                _ => Quality::default(),
            };
            DownloadJob::YouTube {
                url: request.url.clone(),
                quality,
                output: request.output.clone(),
            }
        } else {
            DownloadJob::File(
                DownloadRequest::new(&request.url)
                    .with_optional_destination(request.output.clone())
                    .with_resume(request.resume),
            )
        };

        let (controller, events) = self.session.start(job).into_parts();
        let id = controller.id();
        self.registry.insert(controller);

        tokio::spawn(forward_events(
            id,
            events,
            Arc::clone(&self.sink),
            Arc::clone(&self.registry),
            self.config.speed_window,
        ));
        info!(session = %id, url = %request.url, "GUI download started");
        Ok(id)
    }

    pub fn pause(&self, id: &str) -> Result<(), GuiError> {
        self.registry.controller(id)?.pause()?;
        debug!(session = id, "Pause requested");
        Ok(())
    }

    pub fn resume(&self, id: &str) -> Result<(), GuiError> {
        self.registry.controller(id)?.resume()?;
        debug!(session = id, "Resume requested");
        Ok(())
    }

    /// Pause when transferring, resume when paused.
    pub fn toggle_pause(&self, id: &str) -> Result<SessionPhase, GuiError> {
        let controller = self.registry.controller(id)?;
        if controller.phase() == SessionPhase::Paused || controller.pause_pending() {
            controller.resume()?;
            Ok(SessionPhase::Transferring)
        } else {
            controller.pause()?;
            Ok(SessionPhase::Paused)
        }
    }

    pub fn cancel(&self, id: &str) -> Result<(), GuiError> {
        self.registry.controller(id)?.cancel()?;
        debug!(session = id, "Cancel requested");
        Ok(())
    }

    pub fn phase(&self, id: &str) -> Result<SessionPhase, GuiError> {
        Ok(self.registry.controller(id)?.phase())
    }

    /// Forget a finished, failed or cancelled session.
    pub fn dismiss(&self, id: &str) -> Result<(), GuiError> {
        self.registry.remove(id)
    }

    pub fn sessions(&self) -> Vec<SessionId> {
        self.registry.ids()
    }

    /// Name pre-filled in the save dialog for `url`.
    pub fn suggested_file_name(url: &str, youtube: bool) -> String {
        if youtube || is_youtube_link(url) {
            YOUTUBE_FILE_NAME.to_string()
        } else {
            derive_filename(url.trim(), None)
        }
    }

    /// Entries for the quality selector.
    pub async fn list_qualities(&self, url: &str) -> Result<Vec<QualityOption>, GuiError> {
        Ok(self.youtube().list_qualities(url).await?)
    }

    pub async fn check_tools(&self) -> Vec<ToolStatus> {
        check_tools(&self.config).await
    }

    /// Open the finished file with the desktop's default application.
    pub fn open_file(&self, id: &str) -> Result<PathBuf, GuiError> {
        let path = self.registry.finished_path(id)?;
        open::that(&path)
            .map_err(|e| GuiError::Internal(format!("could not open {}: {e}", path.display())))?;
        Ok(path)
    }

    /// Open the folder holding the finished file.
    pub fn open_folder(&self, id: &str) -> Result<PathBuf, GuiError> {
        let path = self.registry.finished_path(id)?;
        let folder = path
            .parent()
            .map(std::path::Path::to_path_buf)
            .ok_or_else(|| GuiError::Internal(format!("{} has no parent", path.display())))?;
        open::that(&folder)
            .map_err(|e| GuiError::Internal(format!("could not open {}: {e}", folder.display())))?;
        Ok(folder)
    }

    const fn youtube(&self) -> &YouTubeAdapter {
        self.session.youtube()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::events::GuiEvent;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<GuiEvent>>);

    impl GuiEventSink for Recorder {
        fn emit(&self, event: GuiEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn backend() -> (GuiBackend, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let backend = GuiBackend::new(DownloaderConfig::default(), recorder.clone()).unwrap();
        (backend, recorder)
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_immediately() {
        let (backend, recorder) = backend();
        let err = backend
            .start_download(&StartDownloadRequest::new("not a url"))
            .unwrap_err();
        assert!(matches!(err, GuiError::ValidationFailed(_)));
        assert!(backend.sessions().is_empty());
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_quality_is_rejected() {
        let (backend, _) = backend();
        let mut request = StartDownloadRequest::new("https://youtu.be/dQw4w9WgXcQ");
        request.quality = Some("0p".to_string());
        let err = backend.start_download(&request).unwrap_err();
        assert!(matches!(err, GuiError::ValidationFailed(_)));
    }

    #[test]
    fn test_suggested_file_name() {
        assert_eq!(
            GuiBackend::suggested_file_name(" https://example.com/dl/report.pdf ", false),
            "report.pdf"
        );
        assert_eq!(
            GuiBackend::suggested_file_name("https://example.com/download", false),
            "downloaded_file"
        );
        assert_eq!(
            GuiBackend::suggested_file_name("https://youtu.be/dQw4w9WgXcQ", false),
            "video.mp4"
        );
        assert_eq!(GuiBackend::suggested_file_name("", true), "video.mp4");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (backend, _) = backend();
        assert!(matches!(
            backend.pause("nope"),
            Err(GuiError::NotFound { .. })
        ));
        let id = SessionId::new().to_string();
        assert!(matches!(backend.cancel(&id), Err(GuiError::NotFound { .. })));
        assert!(matches!(backend.open_file(&id), Err(GuiError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_failed_session_reports_and_can_be_dismissed() {
        let (backend, recorder) = backend();
        // Port 9 (discard) on localhost refuses connections.
        let id = backend
            .start_download(&StartDownloadRequest::new("http://127.0.0.1:9/file.bin"))
            .unwrap();
        let id_str = id.to_string();

        let mut failed = false;
        for _ in 0..200 {
            failed = recorder
                .0
                .lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, GuiEvent::Failed { .. }));
            if failed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert!(failed, "expected a failure event");

        assert_eq!(assert_ok!(backend.phase(&id_str)), SessionPhase::Failed);
        assert!(matches!(assert_err!(backend.pause(&id_str)), GuiError::Conflict(_)));
        assert!(matches!(
            assert_err!(backend.open_folder(&id_str)),
            GuiError::Conflict(_)
        ));
        assert_ok!(backend.dismiss(&id_str));
        assert!(backend.sessions().is_empty());
    }
}
