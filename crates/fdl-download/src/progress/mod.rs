//! Progress reporting.
//!
//! - `reporter` - Sliding-window speed and ETA
//! - `format` - Size, speed and duration text
//! - `throttle` - Rate limiting for UI delivery
//! - `printer` - Terminal rendering

mod format;
mod printer;
mod reporter;
mod throttle;

pub use format::{format_bytes, format_duration, format_eta, format_speed};
pub use printer::CliProgressPrinter;
pub use reporter::{ProgressReporter, ProgressSnapshot};
pub use throttle::ProgressThrottle;
