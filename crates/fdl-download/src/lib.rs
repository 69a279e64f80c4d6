//! Download engine for fdl.
//!
//! Validation, metadata probing, the resumable HTTP engine, the YouTube
//! adapter and the session worker that drives them. Presentation helpers
//! for the CLI (progress formatting and rendering) live in `progress`.
//!
//! # Structure
//!
//! - `validator` - URL syntax and reachability checks
//! - `prober` - Size and content type of a remote resource
//! - `engine` - Resumable single-connection transfer
//! - `youtube` - yt-dlp subprocess adapter
//! - `session` - One worker per download, phase tracking, event channel
//! - `control` - Cooperative pause/cancel signalling
//! - `progress` - Speed/ETA, formatting and terminal rendering

#![deny(unused_crate_dependencies)]

// Used only by integration tests.
#[cfg(test)]
use axum as _;
#[cfg(test)]
use mockall as _;

pub use fdl_core::{
    DownloadError, DownloadKind, DownloadRequest, DownloadResult, DownloaderConfig,
    RemoteMetadata, SessionPhase, TransferOutcome, TransferState, TransferStatus,
};

mod control;
mod engine;
mod http;
mod prober;
mod session;
mod validator;

pub mod progress;
pub mod youtube;

pub use control::{Interrupt, TransferControl};
pub use engine::FileEngine;
pub use http::build_client;
pub use prober::MetadataProber;
pub use session::{
    DownloadJob, DownloadSession, SessionController, SessionEvent, SessionHandle, SessionId,
    SessionOutcome,
};
pub use validator::{UrlValidator, check_syntax};
