//! yt-dlp subprocess driver.
//!
//! Spawns the tool, streams its stdout through [`parse_line`], and maps its
//! progress into the same [`TransferState`] shape the file engine emits.
//! Pause kills the process (yt-dlp continues its `.part` files on the next
//! launch); cancel kills it and removes the `.part` files it reported.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use fdl_core::{
    DownloadError, DownloadResult, DownloaderConfig, ProgressSink, TransferState, TransferStatus,
};

use super::protocol::{PROGRESS_PREFIX, ProgressAggregator, ToolEvent, parse_line};
use super::selector::Quality;
use super::tools::{locate_ffmpeg, locate_ytdlp};
use super::is_youtube_url;
use crate::control::{Interrupt, TransferControl};

/// Default output template: `<title>.<ext>` in the working directory.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Markers in stderr that point at post-processing rather than extraction.
const MUX_MARKERS: [&str; 5] = ["ffmpeg", "ffprobe", "postprocessing", "merging", "merger"];

/// One entry of the quality selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOption {
    /// Value accepted by `Quality::from_str`.
    pub value: String,
    /// Text shown to the user.
    pub label: String,
}

/// How a single launch of the tool ended.
enum RunOutcome {
    Finished(PathBuf),
    Stopped(Interrupt),
}

/// Drives yt-dlp for one or more downloads.
#[derive(Debug, Clone)]
pub struct YouTubeAdapter {
    ytdlp: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
}

impl YouTubeAdapter {
    /// Locate the tools according to `config`.
    #[must_use]
    pub fn new(config: &DownloaderConfig) -> Self {
        Self {
            ytdlp: locate_ytdlp(config),
            ffmpeg: locate_ffmpeg(config),
        }
    }

    /// Use explicit tool paths.
    #[must_use]
    pub const fn with_tools(ytdlp: Option<PathBuf>, ffmpeg: Option<PathBuf>) -> Self {
        Self { ytdlp, ffmpeg }
    }

    #[must_use]
    pub const fn can_merge(&self) -> bool {
        self.ffmpeg.is_some()
    }

    fn ytdlp(&self) -> DownloadResult<&Path> {
        self.ytdlp
            .as_deref()
            .ok_or_else(|| DownloadError::extraction("yt-dlp was not found on PATH"))
    }

    /// Download `url` at `quality`.
    ///
    /// `output` may be a directory (the title template is placed inside it)
    /// or a yt-dlp output template. Returns the path of the final file.
    pub async fn download(
        &self,
        url: &str,
        quality: &Quality,
        output: Option<&Path>,
        control: &TransferControl,
        sink: &dyn ProgressSink,
    ) -> DownloadResult<PathBuf> {
        check_url(url)?;
        let ytdlp = self.ytdlp()?;

        if !self.can_merge() {
            warn!("ffmpeg not found; requesting single-file formats only");
        }

        let args = self.download_args(url, quality, output);
        let mut part_files = BTreeSet::new();
        let mut last_state = TransferState::pending(None);

        loop {
            last_state = last_state.with_status(TransferStatus::Active);
            sink.emit(last_state);

            let outcome =
                Self::run_once(ytdlp, &args, control, sink, &mut part_files, &mut last_state).await;

            match outcome {
                Ok(RunOutcome::Finished(path)) => {
                    info!(path = %path.display(), "YouTube download complete");
                    let bytes = last_state.total.unwrap_or(last_state.bytes_written);
                    sink.emit(TransferState {
                        bytes_written: bytes,
                        total: Some(bytes),
                        status: TransferStatus::Completed,
                    });
                    return Ok(path);
                }
                Ok(RunOutcome::Stopped(Interrupt::Pause)) => {
                    debug!("yt-dlp stopped for pause");
                    sink.emit(last_state.with_status(TransferStatus::Paused));
                    if !control.wait_for_resume().await {
                        return Err(cancel(&part_files, last_state, sink).await);
                    }
                }
                Ok(RunOutcome::Stopped(Interrupt::Cancel)) => {
                    return Err(cancel(&part_files, last_state, sink).await);
                }
                Err(err) => {
                    warn!(error = %err, "yt-dlp failed");
                    sink.emit(last_state.with_status(TransferStatus::Failed));
                    return Err(err);
                }
            }
        }
    }

    fn download_args(&self, url: &str, quality: &Quality, output: Option<&Path>) -> Vec<String> {
        let template = output_template(output);
        let mut args = vec![
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-simulate".to_string(),
            "--no-playlist".to_string(),
            "--progress-template".to_string(),
            format!("download:{PROGRESS_PREFIX}%(progress)j"),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-f".to_string(),
            quality.format_selector(self.can_merge()),
            "-o".to_string(),
            template,
        ];
        if let Some(ffmpeg) = &self.ffmpeg {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Launch the tool once and follow it until exit or interrupt.
    async fn run_once(
        ytdlp: &Path,
        args: &[String],
        control: &TransferControl,
        sink: &dyn ProgressSink,
        part_files: &mut BTreeSet<PathBuf>,
        last_state: &mut TransferState,
    ) -> DownloadResult<RunOutcome> {
        if let Some(interrupt) = control.pending() {
            return Ok(RunOutcome::Stopped(interrupt));
        }

        debug!(tool = %ytdlp.display(), ?args, "Spawning yt-dlp");
        let mut child = Command::new(ytdlp)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::extraction(format!("failed to start yt-dlp: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::extraction("yt-dlp stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::extraction("yt-dlp stderr unavailable"))?;

        let mut lines = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr);
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_reader.read_to_end(&mut buf).await;
            buf
        });

        let mut aggregator = ProgressAggregator::new();
        let mut final_path: Option<PathBuf> = None;

        loop {
            tokio::select! {
                biased;
                interrupt = control.interrupted() => {
                    let _ = child.kill().await;
                    stderr_task.abort();
                    return Ok(RunOutcome::Stopped(interrupt));
                }
                line = lines.next_line() => {
                    let line = line.map_err(|e| DownloadError::extraction(e.to_string()))?;
                    let Some(line) = line else { break; };

                    match parse_line(&line) {
                        Ok(Some(ToolEvent::Progress(progress))) => {
                            if let Some(tmp) = &progress.tmpfilename {
                                part_files.insert(PathBuf::from(tmp));
                            }
                            let (downloaded, total) = aggregator.update(&progress);
                            *last_state = TransferState {
                                bytes_written: downloaded,
                                total,
                                status: TransferStatus::Active,
                            };
                            sink.emit(*last_state);
                        }
                        Ok(Some(ToolEvent::FinalPath(path))) => {
                            final_path = Some(PathBuf::from(path));
                        }
                        Ok(None) => {}
                        Err(e) => debug!(error = %e, line, "Unparsable yt-dlp line"),
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::extraction(e.to_string()))?;
        let stderr_buf = stderr_task.await.unwrap_or_default();
        let stderr_text = String::from_utf8_lossy(&stderr_buf).trim().to_string();

        if !status.success() {
            return Err(classify_failure(&stderr_text, &status.to_string()));
        }

        final_path
            .map(RunOutcome::Finished)
            .ok_or_else(|| DownloadError::extraction("yt-dlp did not report an output file"))
    }

    /// Quality choices for `url`: the standard names plus every combined
    /// audio+video format the video offers.
    pub async fn list_qualities(&self, url: &str) -> DownloadResult<Vec<QualityOption>> {
        check_url(url)?;
        let ytdlp = self.ytdlp()?;

        let output = Command::new(ytdlp)
            .args(["-J", "--no-warnings", "--no-playlist", "--", url])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DownloadError::extraction(format!("failed to start yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim(), &output.status.to_string()));
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::extraction(format!("unexpected yt-dlp output: {e}")))?;

        Ok(quality_options(&info))
    }
}

fn check_url(url: &str) -> DownloadResult<()> {
    let parsed = Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;
    if is_youtube_url(&parsed) {
        Ok(())
    } else {
        Err(DownloadError::invalid_url(url, "not a YouTube link"))
    }
}

fn output_template(output: Option<&Path>) -> String {
    match output {
        Some(path) if path.is_dir() => path
            .join(DEFAULT_OUTPUT_TEMPLATE)
            .to_string_lossy()
            .into_owned(),
        Some(path) => path.to_string_lossy().into_owned(),
        None => DEFAULT_OUTPUT_TEMPLATE.to_string(),
    }
}

/// Map a failed run to `Mux` or `Extraction` using its stderr.
fn classify_failure(stderr: &str, status: &str) -> DownloadError {
    let message = stderr
        .lines()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .or_else(|| stderr.lines().last().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("yt-dlp exited with {status}"));

    let error_lines: Vec<&str> = stderr.lines().filter(|l| l.starts_with("ERROR:")).collect();
    let lower = if error_lines.is_empty() {
        stderr.to_ascii_lowercase()
    } else {
        error_lines.join("\n").to_ascii_lowercase()
    };
    if MUX_MARKERS.iter().any(|m| lower.contains(m)) {
        DownloadError::mux(message)
    } else {
        DownloadError::extraction(message)
    }
}

async fn cancel(
    part_files: &BTreeSet<PathBuf>,
    last_state: TransferState,
    sink: &dyn ProgressSink,
) -> DownloadError {
    for path in part_files {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed partial file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
        }
    }
    info!("YouTube download cancelled");
    sink.emit(last_state.with_status(TransferStatus::Cancelled));
    DownloadError::Cancelled
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    formats: Vec<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    format_note: Option<String>,
}

impl FormatInfo {
    fn is_combined_video(&self) -> bool {
        let has = |codec: &Option<String>| codec.as_deref().is_some_and(|c| c != "none");
        has(&self.vcodec)
            && has(&self.acodec)
            && matches!(self.ext.as_deref(), Some("mp4" | "webm" | "mkv"))
    }

    fn label(&self) -> String {
        let mut label = self.format_id.clone();
        label.push_str(" -");
        if let Some(h) = self.height {
            let _ = write!(label, " {h}p");
        }
        if let Some(note) = self.format_note.as_deref().filter(|n| !n.is_empty()) {
            label.push(' ');
            label.push_str(note);
        }
        if let Some(ext) = &self.ext {
            label.push(' ');
            label.push_str(ext);
        }
        label
    }
}

fn quality_options(info: &VideoInfo) -> Vec<QualityOption> {
    let mut options = vec![
        QualityOption {
            value: Quality::Best.to_string(),
            label: "Best available".to_string(),
        },
        QualityOption {
            value: Quality::Worst.to_string(),
            label: "Smallest".to_string(),
        },
        QualityOption {
            value: Quality::Audio.to_string(),
            label: "Audio only".to_string(),
        },
    ];

    // Highest resolution first.
    let mut combined: Vec<&FormatInfo> = info
        .formats
        .iter()
        .filter(|f| f.is_combined_video())
        .collect();
    combined.sort_by(|a, b| b.height.cmp(&a.height));

    options.extend(combined.into_iter().map(|f| QualityOption {
        value: f.format_id.clone(),
        label: f.label(),
    }));
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mux_failure() {
        let err = classify_failure(
            "[Merger] Merging formats\nERROR: Postprocessing: ffmpeg exited with code 1",
            "exit status: 1",
        );
        assert!(matches!(err, DownloadError::Mux { .. }));
        assert!(err.to_string().contains("ffmpeg exited"));
    }

    #[test]
    fn test_classify_extraction_failure() {
        let err = classify_failure("ERROR: [youtube] abc: Private video", "exit status: 1");
        match err {
            DownloadError::Extraction { message } => assert!(message.contains("Private video")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_warning_about_ffmpeg_does_not_mask_extraction_error() {
        let err = classify_failure(
            "WARNING: ffmpeg not found\nERROR: [youtube] abc: Video unavailable",
            "exit status: 1",
        );
        assert!(matches!(err, DownloadError::Extraction { .. }));
    }

    #[test]
    fn test_classify_empty_stderr() {
        let err = classify_failure("", "exit status: 2");
        assert!(err.to_string().contains("exit status: 2"));
    }

    #[test]
    fn test_output_template() {
        assert_eq!(output_template(None), DEFAULT_OUTPUT_TEMPLATE);
        assert_eq!(output_template(Some(Path::new("clip.mp4"))), "clip.mp4");

        let dir = tempfile::tempdir().unwrap();
        let template = output_template(Some(dir.path()));
        assert!(template.ends_with(DEFAULT_OUTPUT_TEMPLATE));
    }

    #[test]
    fn test_download_args() {
        let adapter = YouTubeAdapter::with_tools(Some(PathBuf::from("yt-dlp")), None);
        let args = adapter.download_args(
            "https://youtu.be/abc",
            &Quality::MaxHeight(720),
            None,
        );
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"b[height<=720]/b".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
    }

    #[test]
    fn test_quality_options_filter_combined() {
        let info: VideoInfo = serde_json::from_str(
            r#"{"formats": [
                {"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "height": 360, "format_note": "medium"},
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "acodec": "none", "height": 1080},
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a"},
                {"format_id": "22", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "height": 720}
            ]}"#,
        )
        .unwrap();

        let options = quality_options(&info);
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["best", "worst", "audio", "22", "18"]);
        assert_eq!(options[4].label, "18 - 360p medium mp4");
    }

    #[tokio::test]
    async fn test_missing_tool_is_extraction_error() {
        let adapter = YouTubeAdapter::with_tools(None, None);
        let err = adapter
            .download(
                "https://www.youtube.com/watch?v=abc",
                &Quality::Best,
                None,
                &TransferControl::new(),
                &fdl_core::NoopSink,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Extraction { .. }));
    }

    #[tokio::test]
    async fn test_non_youtube_url_rejected() {
        let adapter = YouTubeAdapter::with_tools(Some(PathBuf::from("yt-dlp")), None);
        let err = adapter
            .list_qualities("https://example.com/video")
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
    }
}
