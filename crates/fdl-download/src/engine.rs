//! Resumable single-connection file transfer.
//!
//! The partial file (`<destination>.part`) is the only resume ledger: its
//! length on disk is the next range offset. Nothing else is persisted.
//!
//! # Flow
//!
//! 1. Pick the starting offset from the partial file (or finalize it when it
//!    already holds every byte).
//! 2. `GET` with `Range: bytes=<offset>-` when the offset is non-zero.
//! 3. Check the answer: `206` with a matching `Content-Range` appends; `200`
//!    or a mismatched range rewrites from zero; `416 bytes */N` with
//!    `N == offset` finalizes.
//! 4. Stream the body in fixed-size chunks, emitting progress per chunk.
//! 5. Verify the byte count, fsync, rename onto the destination.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::RANGE;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use fdl_core::utils::{partial_path, resolve_destination};
use fdl_core::{
    DownloadError, DownloadRequest, DownloadResult, DownloaderConfig, ProgressSink, RemoteMetadata,
    TransferOutcome, TransferState, TransferStatus,
};

use crate::control::{Interrupt, TransferControl};
use crate::http::{ContentRange, build_client, content_length};
use crate::validator::describe;

/// Where a transfer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartPlan {
    Transfer { offset: u64 },
    /// The partial file already holds the whole resource.
    Finalize { bytes: u64 },
}

/// Result of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Complete { bytes: u64, started_at: u64 },
    /// The server did not honor the range; discard and start over.
    Restart,
    Stopped { interrupt: Interrupt, written: u64 },
}

/// HTTP download engine.
#[derive(Clone)]
pub struct FileEngine {
    client: reqwest::Client,
    config: DownloaderConfig,
}

impl FileEngine {
    pub fn new(config: &DownloaderConfig) -> DownloadResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            config: config.clone(),
        })
    }

    pub fn with_client(client: reqwest::Client, config: &DownloaderConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Destination a request will be written to.
    pub fn destination_for(request: &DownloadRequest, metadata: &RemoteMetadata) -> PathBuf {
        resolve_destination(
            request.destination(),
            request.url(),
            metadata.content_type.as_deref(),
        )
    }

    /// Download `request` to its destination.
    ///
    /// Progress is emitted into `sink` after every chunk and on every status
    /// change. Returns `DownloadError::Cancelled` when `control` is
    /// cancelled; the partial file is deleted in that case. On a network
    /// error the partial file is kept for a later resume.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        metadata: &RemoteMetadata,
        control: &TransferControl,
        sink: &dyn ProgressSink,
    ) -> DownloadResult<TransferOutcome> {
        let limit = self.config.max_file_size;
        if let Some(size) = metadata.total_size {
            if size > limit {
                return Err(DownloadError::file_too_large(size, limit));
            }
        }

        let destination = Self::destination_for(request, metadata);
        let partial = partial_path(&destination, &self.config.partial_suffix);
        let mut total = metadata.total_size;

        if request.resume() {
            if let Some(bytes) = complete_file_size(&destination, total).await {
                info!(path = %destination.display(), bytes, "Destination already complete");
                sink.emit(TransferState {
                    bytes_written: bytes,
                    total,
                    status: TransferStatus::Completed,
                });
                return Ok(TransferOutcome::AlreadyComplete {
                    path: destination,
                    bytes,
                });
            }
        }

        ensure_parent(&destination).await?;

        let mut offset = match starting_plan(request.resume(), &partial, total).await? {
            StartPlan::Finalize { bytes } => {
                info!(path = %partial.display(), bytes, "Partial file already complete; finalizing");
                finalize(&partial, &destination).await?;
                sink.emit(TransferState {
                    bytes_written: bytes,
                    total,
                    status: TransferStatus::Completed,
                });
                return Ok(TransferOutcome::Downloaded {
                    path: destination,
                    bytes,
                    resumed_from: bytes,
                });
            }
            StartPlan::Transfer { offset } => offset,
        };

        if offset > 0 {
            info!(offset, total = ?total, "Resuming from partial file");
        }

        loop {
            sink.emit(TransferState {
                bytes_written: offset,
                total,
                status: TransferStatus::Active,
            });

            let pass = self
                .transfer(request.url(), &partial, offset, &mut total, control, sink)
                .await;

            match pass {
                Ok(Pass::Complete { bytes, started_at }) => {
                    finalize(&partial, &destination).await?;
                    info!(path = %destination.display(), bytes, "Download complete");
                    sink.emit(TransferState {
                        bytes_written: bytes,
                        total: total.or(Some(bytes)),
                        status: TransferStatus::Completed,
                    });
                    return Ok(TransferOutcome::Downloaded {
                        path: destination,
                        bytes,
                        resumed_from: started_at,
                    });
                }
                Ok(Pass::Restart) => {
                    remove_if_exists(&partial).await?;
                    offset = 0;
                }
                Ok(Pass::Stopped {
                    interrupt: Interrupt::Pause,
                    written,
                }) => {
                    debug!(written, "Transfer paused");
                    sink.emit(TransferState {
                        bytes_written: written,
                        total,
                        status: TransferStatus::Paused,
                    });
                    if control.wait_for_resume().await {
                        offset = file_len(&partial).await?;
                        debug!(offset, "Transfer resumed");
                    } else {
                        return Err(cancel(&partial, written, total, sink).await);
                    }
                }
                Ok(Pass::Stopped {
                    interrupt: Interrupt::Cancel,
                    written,
                }) => {
                    return Err(cancel(&partial, written, total, sink).await);
                }
                Err(err) => {
                    if matches!(err, DownloadError::FileTooLarge { .. }) {
                        remove_if_exists(&partial).await.ok();
                    }
                    let written = file_len(&partial).await.unwrap_or(0);
                    warn!(error = %err, written, "Transfer failed");
                    sink.emit(TransferState {
                        bytes_written: written,
                        total,
                        status: TransferStatus::Failed,
                    });
                    return Err(err);
                }
            }
        }
    }

    /// One request/response cycle.
    #[allow(clippy::too_many_lines)]
    async fn transfer(
        &self,
        url: &str,
        partial: &Path,
        offset: u64,
        total: &mut Option<u64>,
        control: &TransferControl,
        sink: &dyn ProgressSink,
    ) -> DownloadResult<Pass> {
        if let Some(interrupt) = control.pending() {
            return Ok(Pass::Stopped {
                interrupt,
                written: offset,
            });
        }

        let mut builder = self.client.get(url);
        if offset > 0 {
            builder = builder.header(RANGE, format!("bytes={offset}-"));
        }

        let response = tokio::select! {
            biased;
            interrupt = control.interrupted() => {
                return Ok(Pass::Stopped { interrupt, written: offset });
            }
            res = builder.send() => res.map_err(|e| DownloadError::network(describe(&e)))?,
        };

        let status = response.status();
        let content_range = ContentRange::from_headers(response.headers());
        debug!(url, offset, %status, content_range = ?content_range, "Transfer response");

        let start = match status {
            StatusCode::PARTIAL_CONTENT => match content_range {
                Some(ContentRange::Satisfied {
                    start,
                    total: range_total,
                    ..
                }) if start == offset => {
                    if range_total.is_some() {
                        *total = range_total;
                    }
                    offset
                }
                _ if offset > 0 => {
                    info!(offset, "Server answered with a different range; restarting from zero");
                    return Ok(Pass::Restart);
                }
                _ => {
                    return Err(DownloadError::network_with_status(
                        "unexpected partial response to a full request",
                        status.as_u16(),
                    ));
                }
            },
            StatusCode::RANGE_NOT_SATISFIABLE => {
                if let Some(ContentRange::Unsatisfied { total: size }) = content_range {
                    if offset > 0 && size == offset {
                        *total = Some(size);
                        return Ok(Pass::Complete {
                            bytes: offset,
                            started_at: offset,
                        });
                    }
                }
                if offset > 0 {
                    info!(offset, "Range not satisfiable; restarting from zero");
                    return Ok(Pass::Restart);
                }
                return Err(DownloadError::network_with_status(
                    "server refused the request",
                    status.as_u16(),
                ));
            }
            s if s.is_success() => {
                if offset > 0 {
                    info!(offset, "Resume not supported by server; starting fresh");
                }
                if let Some(len) = content_length(response.headers()) {
                    *total = Some(len);
                }
                0
            }
            s => {
                return Err(DownloadError::network_with_status(
                    format!("server answered HTTP {}", s.as_u16()),
                    s.as_u16(),
                ));
            }
        };

        let limit = self.config.max_file_size;
        if let Some(size) = *total {
            if size > limit {
                return Err(DownloadError::file_too_large(size, limit));
            }
        }

        let mut file = if start == 0 {
            File::create(partial).await?
        } else {
            OpenOptions::new().append(true).open(partial).await?
        };

        let chunk_size = self.config.chunk_size;
        let mut pending: Vec<u8> = Vec::with_capacity(chunk_size * 2);
        let mut written = start;
        let mut stream = response.bytes_stream();

        loop {
            if let Some(interrupt) = control.pending() {
                if interrupt == Interrupt::Pause {
                    written += flush_pending(&mut file, &mut pending).await?;
                    file.flush().await?;
                    file.sync_all().await?;
                }
                return Ok(Pass::Stopped { interrupt, written });
            }

            let item = tokio::select! {
                biased;
                _ = control.interrupted() => continue,
                item = stream.next() => item,
            };

            match item {
                Some(Ok(bytes)) => {
                    pending.extend_from_slice(&bytes);
                    while pending.len() >= chunk_size {
                        file.write_all(&pending[..chunk_size]).await?;
                        pending.drain(..chunk_size);
                        written += chunk_size as u64;
                        check_streamed_size(written, *total, limit)?;
                        sink.emit(TransferState {
                            bytes_written: written,
                            total: *total,
                            status: TransferStatus::Active,
                        });
                    }
                }
                Some(Err(e)) => {
                    written += flush_pending(&mut file, &mut pending).await?;
                    file.flush().await?;
                    file.sync_all().await?;
                    return Err(DownloadError::network(format!(
                        "connection lost after {written} bytes: {}",
                        describe(&e)
                    )));
                }
                None => break,
            }
        }

        let tail = flush_pending(&mut file, &mut pending).await?;
        if tail > 0 {
            written += tail;
            check_streamed_size(written, *total, limit)?;
            sink.emit(TransferState {
                bytes_written: written,
                total: *total,
                status: TransferStatus::Active,
            });
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Some(expected) = *total {
            if written < expected {
                return Err(DownloadError::network(format!(
                    "connection closed after {written} of {expected} bytes"
                )));
            }
            if written > expected {
                remove_if_exists(partial).await?;
                return Err(DownloadError::network(format!(
                    "received {written} bytes, expected {expected}"
                )));
            }
        }

        Ok(Pass::Complete {
            bytes: written,
            started_at: start,
        })
    }
}

/// Decide the starting offset from an existing partial file.
async fn starting_plan(resume: bool, partial: &Path, total: Option<u64>) -> DownloadResult<StartPlan> {
    if !resume {
        remove_if_exists(partial).await?;
        return Ok(StartPlan::Transfer { offset: 0 });
    }

    let len = match fs::metadata(partial).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StartPlan::Transfer { offset: 0 }),
        Err(e) => return Err(e.into()),
    };

    match total {
        Some(t) if len == t => Ok(StartPlan::Finalize { bytes: len }),
        Some(t) if len > t => {
            info!(len, total = t, "Partial file larger than remote; discarding");
            remove_if_exists(partial).await?;
            Ok(StartPlan::Transfer { offset: 0 })
        }
        _ => Ok(StartPlan::Transfer { offset: len }),
    }
}

/// Size of `destination` if it already holds `total` bytes.
async fn complete_file_size(destination: &Path, total: Option<u64>) -> Option<u64> {
    let total = total?;
    let meta = fs::metadata(destination).await.ok()?;
    (meta.is_file() && meta.len() == total).then_some(total)
}

const fn check_streamed_size(written: u64, total: Option<u64>, limit: u64) -> DownloadResult<()> {
    if total.is_none() && written > limit {
        return Err(DownloadError::file_too_large(written, limit));
    }
    Ok(())
}

async fn flush_pending(file: &mut File, pending: &mut Vec<u8>) -> DownloadResult<u64> {
    if pending.is_empty() {
        return Ok(0);
    }
    file.write_all(pending).await?;
    let n = pending.len() as u64;
    pending.clear();
    Ok(n)
}

async fn finalize(partial: &Path, destination: &Path) -> DownloadResult<()> {
    let file = OpenOptions::new().write(true).open(partial).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(partial, destination).await?;
    Ok(())
}

async fn cancel(
    partial: &Path,
    written: u64,
    total: Option<u64>,
    sink: &dyn ProgressSink,
) -> DownloadError {
    if let Err(e) = remove_if_exists(partial).await {
        warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
    }
    info!(written, "Transfer cancelled");
    sink.emit(TransferState {
        bytes_written: written,
        total,
        status: TransferStatus::Cancelled,
    });
    DownloadError::Cancelled
}

async fn ensure_parent(destination: &Path) -> DownloadResult<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn file_len(path: &Path) -> DownloadResult<u64> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> DownloadResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
