//! Rate-limits progress updates so terminals and GUI event queues are not
//! flooded by per-chunk snapshots.

use std::time::{Duration, Instant};

use fdl_core::{TransferState, TransferStatus};

/// Passes status changes immediately and byte updates at most once per
/// interval.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    min_interval: Duration,
    last_emit: Option<Instant>,
    last_status: Option<TransferStatus>,
}

impl ProgressThrottle {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: None,
            last_status: None,
        }
    }

    /// 100ms, suitable for UI events.
    pub const fn default_interval() -> Self {
        Self::new(Duration::from_millis(100))
    }

    pub fn admit(&mut self, state: &TransferState) -> bool {
        self.admit_at(Instant::now(), state)
    }

    /// Whether `state`, observed at `now`, should be forwarded.
    pub fn admit_at(&mut self, now: Instant, state: &TransferState) -> bool {
        let status_changed = self.last_status != Some(state.status);
        let due = self
            .last_emit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.min_interval);

        if status_changed || due || state.status != TransferStatus::Active {
            self.last_emit = Some(now);
            self.last_status = Some(state.status);
            true
        } else {
            false
        }
    }

    /// Force the next update through.
    pub const fn reset(&mut self) {
        self.last_emit = None;
        self.last_status = None;
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::default_interval()
    }
}
