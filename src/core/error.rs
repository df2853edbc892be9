use std::path::PathBuf;
use thiserror::Error;

use crate::core::java::ValidationRejection;

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Java runtime registry ───────────────────────────
    #[error("Runtime rejected: {0}")]
    Rejected(#[from] ValidationRejection),

    #[error("Index {index} out of range for scope '{scope_id}' (len {len})")]
    OutOfRange {
        scope_id: String,
        index: usize,
        len: usize,
    },

    // ── Scope storage ───────────────────────────────────
    #[error("Scope not found: {0}")]
    ScopeNotFound(String),

    #[error("Settings for scope '{scope_id}' were not saved: {reason}")]
    Storage { scope_id: String, reason: String },

    #[error("Setting item not found: {0}")]
    SettingItemNotFound(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for Tauri IPC ─────────────────────────
// Tauri commands require the error type to implement `Serialize`.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
