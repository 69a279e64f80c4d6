//! Speed and ETA over a sliding time window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Derived view of one progress sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub bytes: u64,
    pub total: Option<u64>,
    /// 0.0 - 100.0, only when the total is known.
    pub percent: Option<f64>,
    /// Bytes per second over the window; 0.0 until two samples exist.
    pub speed: f64,
    /// Remaining time, only when the total is known and speed > 0.
    #[serde(with = "eta_secs")]
    pub eta: Option<Duration>,
}

/// Turns `(bytes_so_far, total)` samples into speed and ETA.
///
/// One reporter per invocation. Its history is dropped whenever the byte
/// count goes backwards (the transfer restarted from zero).
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    window: Duration,
    samples: VecDeque<(Instant, u64)>,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    pub fn observe(&mut self, bytes: u64, total: Option<u64>) -> ProgressSnapshot {
        self.observe_at(Instant::now(), bytes, total)
    }

    /// Record a sample taken at `now`.
    pub fn observe_at(&mut self, now: Instant, bytes: u64, total: Option<u64>) -> ProgressSnapshot {
        if self.samples.back().is_some_and(|(_, last)| bytes < *last) {
            self.samples.clear();
        }
        self.samples.push_back((now, bytes));

        while self.samples.len() > 2
            && self
                .samples
                .get(1)
                .is_some_and(|(t, _)| now.saturating_duration_since(*t) >= self.window)
        {
            self.samples.pop_front();
        }

        let speed = self.speed();
        ProgressSnapshot {
            bytes,
            total,
            percent: percent(bytes, total),
            speed,
            eta: eta(bytes, total, speed),
        }
    }

    /// Current windowed speed in bytes per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn speed(&self) -> f64 {
        let (Some((t0, b0)), Some((t1, b1))) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let elapsed = t1.saturating_duration_since(*t0).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        b1.saturating_sub(*b0) as f64 / elapsed
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(bytes: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(t) if t > 0 => Some((bytes.min(t) as f64 / t as f64) * 100.0),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn eta(bytes: u64, total: Option<u64>, speed: f64) -> Option<Duration> {
    let total = total?;
    if bytes >= total {
        return Some(Duration::ZERO);
    }
    if speed <= 0.0 || !speed.is_finite() {
        return None;
    }
    Some(Duration::from_secs_f64((total - bytes) as f64 / speed))
}

mod eta_secs {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(eta: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match eta {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_first_sample_has_no_speed() {
        let mut r = ProgressReporter::new(Duration::from_secs(3));
        let snap = r.observe_at(Instant::now(), 100, Some(1000));
        assert!(snap.speed.abs() < f64::EPSILON);
        assert_eq!(snap.eta, None);
        assert!((snap.percent.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_and_eta() {
        let base = Instant::now();
        let mut r = ProgressReporter::new(Duration::from_secs(3));
        r.observe_at(base, 0, Some(10_000));
        let snap = r.observe_at(at(base, 1000), 1000, Some(10_000));
        assert!((snap.speed - 1000.0).abs() < 1e-6);
        assert_eq!(snap.eta, Some(Duration::from_secs(9)));
    }

    #[test]
    fn test_window_drops_old_samples() {
        let base = Instant::now();
        let mut r = ProgressReporter::new(Duration::from_secs(3));
        // Fast start, then slow: the window should only see the slow part.
        r.observe_at(base, 0, None);
        r.observe_at(at(base, 1000), 100_000, None);
        r.observe_at(at(base, 5000), 100_400, None);
        r.observe_at(at(base, 6000), 100_500, None);
        r.observe_at(at(base, 7000), 100_600, None);
        assert!((r.speed() - 100.0).abs() < 1e-6, "speed {}", r.speed());
    }

    #[test]
    fn test_unknown_total_is_indeterminate() {
        let base = Instant::now();
        let mut r = ProgressReporter::new(Duration::from_secs(3));
        r.observe_at(base, 0, None);
        let snap = r.observe_at(at(base, 500), 500, None);
        assert!(snap.speed > 0.0);
        assert_eq!(snap.percent, None);
        assert_eq!(snap.eta, None);
    }

    #[test]
    fn test_backwards_bytes_reset_history() {
        let base = Instant::now();
        let mut r = ProgressReporter::new(Duration::from_secs(3));
        r.observe_at(base, 0, Some(1000));
        r.observe_at(at(base, 1000), 800, Some(1000));
        let snap = r.observe_at(at(base, 1500), 10, Some(1000));
        assert!(snap.speed.abs() < f64::EPSILON);
        assert_eq!(snap.eta, None);
    }

    #[test]
    fn test_complete_has_zero_eta() {
        let mut r = ProgressReporter::new(Duration::from_secs(3));
        let snap = r.observe_at(Instant::now(), 1000, Some(1000));
        assert_eq!(snap.eta, Some(Duration::ZERO));
    }
}
