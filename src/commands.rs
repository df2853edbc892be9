use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::core::error::LauncherError;
use crate::core::registry::{RuntimeDescriptor, ScopeConfig};
use crate::core::state::AppState;

/// Name of the only setting item the registry serves. The settings surface
/// dispatches by item name so more items can join later.
const JAVA_SETTING_ITEM: &str = "java";

/// Wire shape of the Java setting: the runtime list plus the selected
/// position (`null` when nothing is selected).
#[derive(Debug, Serialize)]
pub struct JavaSettingValue {
    pub runtimes: Vec<RuntimeDescriptor>,
    pub selected: Option<usize>,
}

impl From<ScopeConfig> for JavaSettingValue {
    fn from(config: ScopeConfig) -> Self {
        Self {
            runtimes: config.runtimes,
            selected: config.selected_index,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddRuntimeResponse {
    Added { runtime: RuntimeDescriptor },
    Cancelled,
}

#[tauri::command]
pub async fn get_setting_value(
    state: tauri::State<'_, Arc<AppState>>,
    scope_id: String,
    item_name: String,
) -> Result<JavaSettingValue, LauncherError> {
    if item_name != JAVA_SETTING_ITEM {
        return Err(LauncherError::SettingItemNotFound(item_name));
    }
    Ok(state.registry.get_scope(&scope_id).await?.into())
}

#[tauri::command]
pub async fn select_java_runtime(
    state: tauri::State<'_, Arc<AppState>>,
    scope_id: String,
    index: usize,
) -> Result<(), LauncherError> {
    state.registry.select(&scope_id, index).await
}

/// Let the user pick a Java executable with the native file dialog, then
/// validate and register it. Closing the dialog without a choice is a
/// structured no-op, not an error.
#[tauri::command]
pub async fn add_java_runtime_by_path(
    state: tauri::State<'_, Arc<AppState>>,
    scope_id: String,
) -> Result<AddRuntimeResponse, LauncherError> {
    let picked = tokio::task::spawn_blocking(|| {
        let dialog = rfd::FileDialog::new().set_title("Select a Java executable");
        #[cfg(windows)]
        let dialog = dialog.add_filter("Java executable", &["exe"]);
        dialog.pick_file()
    })
    .await
    .map_err(|error| LauncherError::Other(format!("File dialog task failed: {error}")))?;

    let Some(path) = picked else {
        info!("Java runtime file dialog cancelled for scope '{}'", scope_id);
        return Ok(AddRuntimeResponse::Cancelled);
    };

    let runtime = state.registry.add_path(&scope_id, &path).await?;
    Ok(AddRuntimeResponse::Added { runtime })
}

#[tauri::command]
pub async fn refresh_java_runtimes(
    state: tauri::State<'_, Arc<AppState>>,
    scope_id: String,
) -> Result<JavaSettingValue, LauncherError> {
    Ok(state.registry.refresh(&scope_id).await?.into())
}

#[tauri::command]
pub async fn remove_java_runtime(
    state: tauri::State<'_, Arc<AppState>>,
    scope_id: String,
    index: usize,
) -> Result<(), LauncherError> {
    state.registry.remove(&scope_id, index).await
}

#[tauri::command]
pub async fn delete_modpack_scope(
    state: tauri::State<'_, Arc<AppState>>,
    scope_id: String,
) -> Result<(), LauncherError> {
    state.registry.delete_scope(&scope_id).await
}
