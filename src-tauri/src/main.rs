// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod commands;
mod event_emitter;

use std::sync::Arc;

use dotenvy::dotenv;
use fdl_core::DownloaderConfig;
use fdl_gui::GuiBackend;
use tauri::Manager;
use tracing::{error, info};

use event_emitter::TauriEventSink;

/// Log level is controlled by `RUST_LOG` (default: warn).
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .try_init()
        .ok();
}

fn load_config() -> DownloaderConfig {
    match DownloaderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid FDL_* environment, using defaults");
            DownloaderConfig::default()
        }
    }
}

fn main() {
    let _ = dotenv();
    init_tracing();

    info!("fdl desktop starting");

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let sink = Arc::new(TauriEventSink::new(app.handle().clone()));
            let gui = GuiBackend::new(load_config(), sink)?;
            app.manage(gui);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::start_download,
            commands::pause_download,
            commands::resume_download,
            commands::toggle_pause,
            commands::cancel_download,
            commands::dismiss_download,
            commands::list_qualities,
            commands::check_tools,
            commands::open_file,
            commands::open_folder,
            commands::choose_output,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        error!(error = %e, "Tauri application failed");
        std::process::exit(1);
    }
}
