use std::path::PathBuf;

use crate::core::error::LauncherResult;
use crate::core::java::{RuntimeProbe, RuntimeValidator};
use crate::core::paths::launcher_paths;
use crate::core::registry::{RuntimeRegistry, ScopeStore};

/// Long-lived backend state managed by Tauri. The registry carries its own
/// per-scope locking, so commands share this through a plain `Arc`.
pub struct AppState {
    pub config_dir: PathBuf,
    pub registry: RuntimeRegistry,
}

impl AppState {
    pub fn new() -> LauncherResult<Self> {
        let paths = launcher_paths()?;
        let registry = RuntimeRegistry::new(
            ScopeStore::new(paths.scopes_dir()),
            RuntimeProbe::new(),
            RuntimeValidator::new(),
        );

        Ok(Self {
            config_dir: paths.config_dir().to_path_buf(),
            registry,
        })
    }
}
