//! Port definitions (trait abstractions) for external systems.
//!
//! Adapters implement these traits; the download crate only ever sees
//! `&dyn ProgressSink`.

pub mod progress;

pub use progress::{NoopSink, ProgressSink};
