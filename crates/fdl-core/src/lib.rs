//! Core domain types and port definitions for fdl.
//!
//! Pure data and traits: requests, transfer state, the error taxonomy, the
//! session phase machine and configuration. Networking, files and
//! subprocesses live in `fdl-download`.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod download;
pub mod ports;
pub mod utils;

pub use config::{ConfigError, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_SIZE, DownloaderConfig};
pub use download::{
    DownloadError, DownloadKind, DownloadRequest, DownloadResult, PhaseError, PhaseMachine,
    RemoteMetadata, SessionPhase, TransferOutcome, TransferState, TransferStatus,
};
pub use ports::{NoopSink, ProgressSink};
