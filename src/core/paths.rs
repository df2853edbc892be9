use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "rev-launcher";

/// Resolved per-user directories the launcher writes into.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    config_dir: PathBuf,
}

impl LauncherPaths {
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Directory holding one persisted record per configuration scope.
    pub fn scopes_dir(&self) -> PathBuf {
        self.config_dir.join("scopes")
    }
}

static LAUNCHER_PATHS: OnceLock<LauncherPaths> = OnceLock::new();

pub fn launcher_paths() -> LauncherResult<&'static LauncherPaths> {
    if let Some(paths) = LAUNCHER_PATHS.get() {
        return Ok(paths);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME);
    let canonical_config = canonical_or_create_dir(&config_dir)?;

    let paths = LauncherPaths {
        config_dir: canonical_config,
    };

    let _ = LAUNCHER_PATHS.set(paths);
    Ok(LAUNCHER_PATHS.get().expect("launcher paths set"))
}

fn canonical_or_create_dir(path: &Path) -> LauncherResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::canonicalize(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })
}
