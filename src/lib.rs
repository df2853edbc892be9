mod commands;
mod core;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::core::state::AppState;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rev_launcher_lib=debug")),
        )
        .init();

    tracing::info!("rev-launcher starting...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            use tauri::Manager;
            let state = AppState::new()?;
            app.manage(Arc::new(state));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_setting_value,
            commands::select_java_runtime,
            commands::add_java_runtime_by_path,
            commands::refresh_java_runtimes,
            commands::remove_java_runtime,
            commands::delete_modpack_scope,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
