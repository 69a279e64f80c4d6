//! Tauri implementation of `GuiEventSink`.

use fdl_gui::{GuiEvent, GuiEventSink};
use tauri::{AppHandle, Emitter};

/// Emits download events to the webview under `GuiEvent::event_name`.
#[derive(Clone)]
pub struct TauriEventSink {
    app_handle: AppHandle,
}

impl TauriEventSink {
    pub const fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }
}

impl GuiEventSink for TauriEventSink {
    fn emit(&self, event: GuiEvent) {
        let event_name = event.event_name();
        if let Err(e) = self.app_handle.emit(event_name, &event) {
            tracing::warn!(
                event = %event_name,
                session = %event.session_id(),
                error = %e,
                "Failed to emit Tauri event"
            );
        }
    }
}

impl std::fmt::Debug for TauriEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TauriEventSink").finish()
    }
}
