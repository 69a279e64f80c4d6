//! Human-readable sizes, speeds and durations.

use std::time::Duration;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// `12.50 MB` style size with 1024-based units.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    format_scaled(bytes as f64)
}

/// `1.25 MB/s`, or `N/A` when no speed is known yet.
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec > 0.0 && bytes_per_sec.is_finite() {
        format!("{}/s", format_scaled(bytes_per_sec))
    } else {
        "N/A".to_string()
    }
}

/// `1h 2m 3s`, `2m 3s` or `3s`; `N/A` when unknown.
#[must_use]
pub fn format_eta(eta: Option<Duration>) -> String {
    eta.map_or_else(|| "N/A".to_string(), format_duration)
}

#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

fn format_scaled(mut value: f64) -> String {
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(13_107_200), "12.50 MB");
        assert_eq!(format_bytes(10 * 1024 * 1024 * 1024), "10.00 GB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(0.0), "N/A");
        assert_eq!(format_speed(2048.0), "2.00 KB/s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(3)), "3s");
        assert_eq!(format_duration(Duration::from_secs(123)), "2m 3s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 2m 3s");
        assert_eq!(format_eta(None), "N/A");
    }
}
