//! Cooperative pause/cancel signalling for one transfer.
//!
//! The worker polls this between chunks; the control surface flips it from
//! any thread. Nothing is ever interrupted mid-write.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Why a running transfer stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Pause,
    Cancel,
}

/// Shared pause flag plus cancellation token.
///
/// Cheap to clone; every clone controls the same transfer.
#[derive(Debug, Clone)]
pub struct TransferControl {
    cancel: CancellationToken,
    paused: Arc<watch::Sender<bool>>,
}

impl TransferControl {
    #[must_use]
    pub fn new() -> Self {
        let (paused, _rx) = watch::channel(false);
        Self {
            cancel: CancellationToken::new(),
            paused: Arc::new(paused),
        }
    }

    /// Request a pause at the next chunk boundary.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Clear the pause flag.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Request cancellation. Overrides a pending pause.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The pending interrupt, cancellation first.
    #[must_use]
    pub fn pending(&self) -> Option<Interrupt> {
        if self.is_cancelled() {
            Some(Interrupt::Cancel)
        } else if self.is_paused() {
            Some(Interrupt::Pause)
        } else {
            None
        }
    }

    /// Resolves once a pause or cancel is requested.
    pub async fn interrupted(&self) -> Interrupt {
        let mut rx = self.paused.subscribe();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Interrupt::Cancel,
            res = rx.wait_for(|paused| *paused) => {
                if res.is_ok() { Interrupt::Pause } else { Interrupt::Cancel }
            }
        }
    }

    /// While paused, wait until resumed or cancelled.
    ///
    /// Returns `true` to resume, `false` if the transfer was cancelled.
    pub async fn wait_for_resume(&self) -> bool {
        let mut rx = self.paused.subscribe();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            res = rx.wait_for(|paused| !*paused) => res.is_ok() && !self.is_cancelled(),
        }
    }

    /// Child token for tasks that must die with this transfer.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for TransferControl {
    fn default() -> Self {
        Self::new()
    }
}
