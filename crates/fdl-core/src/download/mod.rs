//! Download domain types, errors, and the session state machine.
//!
//! This module contains pure data types. No I/O, networking, or runtime
//! dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Requests, remote metadata, transfer state and outcomes
//! - `errors` - Error taxonomy for every download stage
//! - `phase` - Control-surface phases and their legal transitions

pub mod errors;
pub mod phase;
pub mod types;

pub use errors::{DownloadError, DownloadResult};
pub use phase::{PhaseError, PhaseMachine, SessionPhase};
pub use types::{
    DownloadKind, DownloadRequest, RemoteMetadata, TransferOutcome, TransferState, TransferStatus,
};
