//! GUI backend facade for fdl.
//!
//! `GuiBackend` owns one download session per transfer and forwards session
//! events to an adapter-supplied [`GuiEventSink`]. It has no toolkit
//! dependency; the Tauri shell in `src-tauri` is a thin adapter over it.
//!
//! ```text
//! Adapter:   src-tauri (commands + TauriEventSink)
//!                 ↓
//! Facade:    fdl-gui  GuiBackend
//!                 ↓
//! Engine:    fdl-download  DownloadSession
//! ```

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod backend;
mod error;
mod events;
mod registry;
pub mod types;

pub use backend::GuiBackend;
pub use error::GuiError;
pub use events::{GuiEvent, GuiEventSink, progress_text};
pub use types::StartDownloadRequest;

pub use fdl_core::{DownloaderConfig, SessionPhase};
pub use fdl_download::SessionId;
pub use fdl_download::youtube::{QualityOption, ToolStatus};
