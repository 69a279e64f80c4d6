//! `fdl download`.
//!
//! Ctrl+C pauses the transfer at the next chunk boundary and exits with 130;
//! the partial file stays on disk so the next run resumes from it.

use tracing::debug;

use fdl_core::utils::derive_filename;
use fdl_core::{
    DownloadError, DownloadKind, DownloadRequest, DownloaderConfig, SessionPhase,
    TransferOutcome, TransferStatus,
};
use fdl_download::progress::{CliProgressPrinter, ProgressReporter, format_bytes};
use fdl_download::youtube::{YouTubeAdapter, is_youtube_link};
use fdl_download::{
    DownloadJob, DownloadSession, FileEngine, MetadataProber, SessionEvent, SessionHandle,
    SessionOutcome,
};

use crate::commands::DownloadArgs;
use crate::error::CliError;
use crate::utils::input::prompt_confirmation;

/// Execute the download command.
pub async fn execute(config: &DownloaderConfig, args: &DownloadArgs) -> Result<(), CliError> {
    let config = apply_overrides(config.clone(), args)?;
    let kind = download_kind(args);

    if args.list_qualities {
        if kind != DownloadKind::YouTube {
            return Err(CliError::Arguments(
                "--list-qualities only works with YouTube links".to_string(),
            ));
        }
        return list_qualities(&config, &args.url).await;
    }

    let job = match kind {
        DownloadKind::File => {
            let request = DownloadRequest::new(&args.url)
                .with_optional_destination(args.output.clone())
                .with_resume(!args.no_resume);
            DownloadJob::File(confirm_overwrite(&config, request, args.yes).await?)
        }
        DownloadKind::YouTube => DownloadJob::YouTube {
            url: args.url.clone(),
            quality: args.quality.clone(),
            output: args.output.clone(),
        },
    };

    let label = progress_label(&args.url, kind);
    let session = DownloadSession::new(&config)?;
    let handle = session.start(job);
    debug!(session = %handle.id(), "Download started");

    let outcome = drive(handle, &config, &label).await?;
    println!("{}", completion_message(&outcome));
    Ok(())
}

fn apply_overrides(
    mut config: DownloaderConfig,
    args: &DownloadArgs,
) -> Result<DownloaderConfig, CliError> {
    if let Some(max) = args.max_size {
        config = config.with_max_file_size(max);
    }
    config.validate()?;
    Ok(config)
}

fn download_kind(args: &DownloadArgs) -> DownloadKind {
    if args.youtube || is_youtube_link(&args.url) {
        DownloadKind::YouTube
    } else {
        DownloadKind::File
    }
}

/// A resumed download never prompts: the engine either reports the file as
/// complete or continues the partial.
const fn needs_confirmation(destination_exists: bool, resume: bool, assume_yes: bool) -> bool {
    destination_exists && !resume && !assume_yes
}

/// Ask before a fresh download replaces an existing file.
///
/// The destination is resolved from probed metadata exactly as the engine
/// resolves it, then pinned on the request so both agree on the path.
async fn confirm_overwrite(
    config: &DownloaderConfig,
    request: DownloadRequest,
    assume_yes: bool,
) -> Result<DownloadRequest, CliError> {
    if request.resume() || assume_yes {
        return Ok(request);
    }
    let metadata = match MetadataProber::new(config)?.probe(request.url()).await {
        Ok(metadata) => metadata,
        Err(e) => {
            // The session reports the failure with its own validation.
            debug!(error = %e, "Probe before overwrite check failed");
            return Ok(request);
        }
    };

    let destination = FileEngine::destination_for(&request, &metadata);
    if !needs_confirmation(destination.exists(), request.resume(), assume_yes) {
        return Ok(request.with_destination(destination));
    }
    let prompt = format!("{} already exists. Overwrite?", destination.display());
    if prompt_confirmation(&prompt)? {
        Ok(request.with_destination(destination))
    } else {
        Err(CliError::Declined(destination))
    }
}

async fn list_qualities(config: &DownloaderConfig, url: &str) -> Result<(), CliError> {
    let options = YouTubeAdapter::new(config).list_qualities(url).await?;
    println!("{:<12} DESCRIPTION", "QUALITY");
    for option in options {
        println!("{:<12} {}", option.value, option.label);
    }
    Ok(())
}

/// Render session events until the session finishes or Ctrl+C pauses it.
async fn drive(
    mut handle: SessionHandle,
    config: &DownloaderConfig,
    label: &str,
) -> Result<SessionOutcome, CliError> {
    let mut printer = CliProgressPrinter::new();
    let mut reporter = ProgressReporter::new(config.speed_window);
    let mut interrupted = false;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = res {
                    debug!(error = %e, "Ctrl+C handler unavailable");
                    continue;
                }
                if handle.pause().is_err() {
                    // Nothing on disk yet; stop outright.
                    handle.cancel().ok();
                }
            }
            event = handle.next_event() => {
                let Some(event) = event else {
                    printer.finish();
                    return Err(DownloadError::Cancelled.into());
                };
                match event {
                    SessionEvent::Phase(SessionPhase::Paused) if interrupted => {
                        printer.finish();
                        eprintln!("Paused. The partial download is kept.");
                        return Err(CliError::Interrupted);
                    }
                    SessionEvent::Phase(phase) => debug!(phase = phase.as_str(), "Session phase"),
                    SessionEvent::Progress(state) => {
                        if matches!(state.status, TransferStatus::Active | TransferStatus::Completed) {
                            let snapshot = reporter.observe(state.bytes_written, state.total);
                            printer.update(label, &snapshot);
                        }
                    }
                    SessionEvent::Finished(result) => {
                        printer.finish();
                        return result.map_err(CliError::from);
                    }
                }
            }
        }
    }
}

fn progress_label(url: &str, kind: DownloadKind) -> String {
    match kind {
        DownloadKind::File => derive_filename(url, None),
        DownloadKind::YouTube => "video".to_string(),
    }
}

fn completion_message(outcome: &SessionOutcome) -> String {
    match outcome {
        SessionOutcome::File(TransferOutcome::AlreadyComplete { path, bytes }) => format!(
            "Already downloaded: {} ({})",
            path.display(),
            format_bytes(*bytes)
        ),
        SessionOutcome::File(TransferOutcome::Downloaded {
            path,
            bytes,
            resumed_from,
        }) if *resumed_from > 0 => format!(
            "Saved {} ({}, resumed at {})",
            path.display(),
            format_bytes(*bytes),
            format_bytes(*resumed_from)
        ),
        SessionOutcome::File(TransferOutcome::Downloaded { path, bytes, .. }) => {
            format!("Saved {} ({})", path.display(), format_bytes(*bytes))
        }
        SessionOutcome::Video { path } => format!("Saved {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use fdl_core::RemoteMetadata;
    use fdl_download::youtube::Quality;

    use super::*;

    fn args(url: &str) -> DownloadArgs {
        DownloadArgs {
            url: url.to_string(),
            output: None,
            youtube: false,
            no_resume: false,
            quality: Quality::Best,
            max_size: None,
            yes: false,
            list_qualities: false,
        }
    }

    #[test]
    fn test_download_kind_detection() {
        assert_eq!(download_kind(&args("https://example.com/a.zip")), DownloadKind::File);
        assert_eq!(
            download_kind(&args("https://youtu.be/dQw4w9WgXcQ")),
            DownloadKind::YouTube
        );
        let mut forced = args("https://example.com/watch");
        forced.youtube = true;
        assert_eq!(download_kind(&forced), DownloadKind::YouTube);
    }

    #[test]
    fn test_needs_confirmation() {
        assert!(needs_confirmation(true, false, false));
        assert!(!needs_confirmation(true, false, true));
        assert!(!needs_confirmation(true, true, false));
        assert!(!needs_confirmation(false, false, false));
    }

    #[test]
    fn test_confirm_overwrite_skips_resumable_requests() {
        let request = DownloadRequest::new("https://example.com/a.zip");
        let kept = tokio_test::block_on(confirm_overwrite(
            &DownloaderConfig::default(),
            request.clone(),
            false,
        ))
        .unwrap();
        assert_eq!(kept, request);

        let fresh = request.with_resume(false);
        let kept = tokio_test::block_on(confirm_overwrite(
            &DownloaderConfig::default(),
            fresh.clone(),
            true,
        ))
        .unwrap();
        assert_eq!(kept, fresh);
    }

    #[test]
    fn test_overwrite_check_uses_probed_content_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("downloaded_file.pdf"), b"old").unwrap();

        let request = DownloadRequest::new("https://example.com/download")
            .with_destination(dir.path())
            .with_resume(false);
        let metadata = RemoteMetadata {
            content_type: Some("application/pdf".to_string()),
            ..RemoteMetadata::default()
        };

        let destination = FileEngine::destination_for(&request, &metadata);
        assert_eq!(destination, dir.path().join("downloaded_file.pdf"));
        assert!(needs_confirmation(destination.exists(), false, false));

        // Once pinned, the engine writes exactly the confirmed path.
        let pinned = request.with_destination(&destination);
        assert_eq!(
            FileEngine::destination_for(&pinned, &RemoteMetadata::default()),
            destination
        );
    }

    #[test]
    fn test_max_size_override() {
        let mut a = args("https://example.com/a.zip");
        a.max_size = Some(1024);
        let config = apply_overrides(DownloaderConfig::default(), &a).unwrap();
        assert_eq!(config.max_file_size, 1024);

        a.max_size = Some(0);
        let err = apply_overrides(DownloaderConfig::default(), &a).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_completion_messages() {
        let path = PathBuf::from("/tmp/a.zip");
        let fresh = SessionOutcome::File(TransferOutcome::Downloaded {
            path: path.clone(),
            bytes: 2048,
            resumed_from: 0,
        });
        assert_eq!(completion_message(&fresh), "Saved /tmp/a.zip (2.00 KB)");

        let resumed = SessionOutcome::File(TransferOutcome::Downloaded {
            path: path.clone(),
            bytes: 2048,
            resumed_from: 1024,
        });
        assert_eq!(
            completion_message(&resumed),
            "Saved /tmp/a.zip (2.00 KB, resumed at 1.00 KB)"
        );

        let done = SessionOutcome::File(TransferOutcome::AlreadyComplete { path, bytes: 2048 });
        assert_eq!(
            completion_message(&done),
            "Already downloaded: /tmp/a.zip (2.00 KB)"
        );
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(
            progress_label("https://example.com/dir/file.iso", DownloadKind::File),
            "file.iso"
        );
        assert_eq!(
            progress_label("https://youtu.be/x", DownloadKind::YouTube),
            "video"
        );
    }

    #[tokio::test]
    async fn test_list_qualities_rejects_plain_urls() {
        let mut a = args("https://example.com/a.zip");
        a.list_qualities = true;
        let err = execute(&DownloaderConfig::default(), &a).await.unwrap_err();
        assert!(matches!(err, CliError::Arguments(_)));
    }
}
