//! Tauri command handlers.
//!
//! Each command is a one-line delegation to `GuiBackend`; errors cross the
//! bridge as their display string.

use std::path::PathBuf;

use fdl_gui::{GuiBackend, GuiError, QualityOption, SessionPhase, StartDownloadRequest, ToolStatus};
use tauri::{AppHandle, State};
use tauri_plugin_dialog::DialogExt;

fn to_string(e: GuiError) -> String {
    e.to_string()
}

/// Start a download; returns the session id used by every other command.
///
/// Async so the session tasks are spawned on Tauri's tokio runtime.
#[tauri::command]
pub async fn start_download(
    request: StartDownloadRequest,
    gui: State<'_, GuiBackend>,
) -> Result<String, String> {
    gui.start_download(&request)
        .map(|id| id.to_string())
        .map_err(to_string)
}

#[tauri::command]
pub fn pause_download(id: String, gui: State<'_, GuiBackend>) -> Result<(), String> {
    gui.pause(&id).map_err(to_string)
}

#[tauri::command]
pub fn resume_download(id: String, gui: State<'_, GuiBackend>) -> Result<(), String> {
    gui.resume(&id).map_err(to_string)
}

/// The Pause/Resume button. Returns the phase the session moves to.
#[tauri::command]
pub fn toggle_pause(id: String, gui: State<'_, GuiBackend>) -> Result<SessionPhase, String> {
    gui.toggle_pause(&id).map_err(to_string)
}

#[tauri::command]
pub fn cancel_download(id: String, gui: State<'_, GuiBackend>) -> Result<(), String> {
    gui.cancel(&id).map_err(to_string)
}

#[tauri::command]
pub fn dismiss_download(id: String, gui: State<'_, GuiBackend>) -> Result<(), String> {
    gui.dismiss(&id).map_err(to_string)
}

#[tauri::command]
pub async fn list_qualities(
    url: String,
    gui: State<'_, GuiBackend>,
) -> Result<Vec<QualityOption>, String> {
    gui.list_qualities(&url).await.map_err(to_string)
}

#[tauri::command]
pub async fn check_tools(gui: State<'_, GuiBackend>) -> Result<Vec<ToolStatus>, String> {
    Ok(gui.check_tools().await)
}

#[tauri::command]
pub fn open_file(id: String, gui: State<'_, GuiBackend>) -> Result<PathBuf, String> {
    gui.open_file(&id).map_err(to_string)
}

#[tauri::command]
pub fn open_folder(id: String, gui: State<'_, GuiBackend>) -> Result<PathBuf, String> {
    gui.open_folder(&id).map_err(to_string)
}

/// The Browse button: a save-as dialog pre-filled with a name derived from
/// the URL. `None` when the user dismisses it.
#[tauri::command]
pub async fn choose_output(
    url: String,
    youtube: bool,
    app: AppHandle,
) -> Result<Option<PathBuf>, String> {
    let suggested = GuiBackend::suggested_file_name(&url, youtube);
    let picked = tauri::async_runtime::spawn_blocking(move || {
        app.dialog()
            .file()
            .set_file_name(suggested)
            .blocking_save_file()
    })
    .await
    .map_err(|e| e.to_string())?;

    picked
        .map(|path| path.into_path().map_err(|e| e.to_string()))
        .transpose()
}
