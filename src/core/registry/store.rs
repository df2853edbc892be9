use std::path::PathBuf;

use tracing::warn;

use super::model::ScopeConfig;
use crate::core::error::{LauncherError, LauncherResult};

/// Durable storage for scope records: one JSON file per scope under the
/// launcher config directory.
///
/// Saves follow a write-then-rename discipline so an interrupted write never
/// leaves a corrupted record in place, and a record that fails to parse is
/// treated as absent (the scope is simply re-discovered) rather than
/// propagated as an error.
pub struct ScopeStore {
    scopes_dir: PathBuf,
}

impl ScopeStore {
    pub fn new(scopes_dir: PathBuf) -> Self {
        Self { scopes_dir }
    }

    /// Load a scope record. `Ok(None)` covers both "never persisted" and
    /// "persisted but corrupted"; the caller bootstraps via discovery in
    /// either case.
    pub async fn load(&self, scope_id: &str) -> LauncherResult<Option<ScopeConfig>> {
        let record_path = self.record_path(scope_id);
        let json = match tokio::fs::read_to_string(&record_path).await {
            Ok(json) => json,
            Err(_) => return Ok(None),
        };

        match serde_json::from_str::<ScopeConfig>(&json) {
            // Sanitized filenames can collide for distinct scope ids; a
            // record owned by another scope is as unusable as a corrupt one.
            Ok(config) if config.scope_id == scope_id => Ok(Some(config)),
            Ok(config) => {
                warn!(
                    "Scope record at {:?} belongs to '{}', not '{}'; scheduling re-discovery",
                    record_path, config.scope_id, scope_id
                );
                Ok(None)
            }
            Err(error) => {
                warn!(
                    "Corrupt scope record at {:?}, scheduling re-discovery: {}",
                    record_path, error
                );
                Ok(None)
            }
        }
    }

    /// Persist a scope record atomically: the payload goes to a `.tmp`
    /// sibling first and is renamed into place only once fully written.
    pub async fn save(&self, config: &ScopeConfig) -> LauncherResult<()> {
        let record_path = self.record_path(&config.scope_id);
        if let Some(parent) = record_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let json = serde_json::to_string_pretty(config)?;
        let tmp_path = record_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|source| LauncherError::Io {
                path: tmp_path.clone(),
                source,
            })?;

        tokio::fs::rename(&tmp_path, &record_path)
            .await
            .map_err(|source| LauncherError::Io {
                path: record_path,
                source,
            })
    }

    /// Delete a scope record from disk.
    pub async fn delete(&self, scope_id: &str) -> LauncherResult<()> {
        let record_path = self.record_path(scope_id);
        if !record_path.exists() {
            return Err(LauncherError::ScopeNotFound(scope_id.to_string()));
        }

        tokio::fs::remove_file(&record_path)
            .await
            .map_err(|source| LauncherError::Io {
                path: record_path,
                source,
            })
    }

    fn record_path(&self, scope_id: &str) -> PathBuf {
        self.scopes_dir
            .join(format!("{}.json", sanitize_scope_id(scope_id)))
    }
}

/// Scope ids come from modpack identifiers; keep the filename portable.
fn sanitize_scope_id(scope_id: &str) -> String {
    scope_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
