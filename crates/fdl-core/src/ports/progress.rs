//! Progress sink port.
//!
//! Both the file engine and the YouTube adapter report through this trait,
//! so the presentation layer never needs to know which one is running.

use std::sync::Arc;

use crate::download::TransferState;

/// Receiver of transfer snapshots.
///
/// Called once per chunk and on every status change. Implementations must
/// not block; forward to a channel or update a cheap in-memory value.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    /// Deliver one snapshot.
    fn emit(&self, state: TransferState);
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _state: TransferState) {}
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn emit(&self, state: TransferState) {
        (**self).emit(state);
    }
}
