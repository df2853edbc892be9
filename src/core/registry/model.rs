use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::java::JavaVersion;

/// Provenance of a runtime entry. Not needed for correctness, but the UI
/// labels entries with it and auto-pruning (if ever added) would only touch
/// `Discovered` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeSource {
    Discovered,
    UserAdded,
}

/// A validated Java executable known to a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeDescriptor {
    pub path: PathBuf,
    pub version: JavaVersion,
    pub source: RuntimeSource,
}

/// Per-scope runtime list and selection. `runtimes` keeps insertion order,
/// which is also the display/index order the UI sees.
///
/// Invariant: `selected_index`, when `Some`, is a valid index into
/// `runtimes` at every point observable outside this module. All mutations
/// go through the methods below, which fix the index up atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub scope_id: String,
    pub runtimes: Vec<RuntimeDescriptor>,
    pub selected_index: Option<usize>,
}

impl ScopeConfig {
    pub fn new(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            runtimes: Vec::new(),
            selected_index: None,
        }
    }

    /// Position of a runtime by its (normalized) path key.
    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.runtimes
            .iter()
            .position(|runtime| runtime.path == path)
    }

    /// Returns false when `index` is not a valid position.
    #[must_use]
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.runtimes.len() {
            return false;
        }
        self.selected_index = Some(index);
        true
    }

    /// Append a runtime and return its position. The caller is responsible
    /// for path-deduplication beforehand.
    pub fn push(&mut self, descriptor: RuntimeDescriptor) -> usize {
        self.runtimes.push(descriptor);
        self.runtimes.len() - 1
    }

    /// Remove the runtime at `index`, fixing up the selection: removing the
    /// selected entry clears the selection (never silently re-selects),
    /// removing below it shifts it down by one.
    pub fn remove(&mut self, index: usize) -> Option<RuntimeDescriptor> {
        if index >= self.runtimes.len() {
            return None;
        }
        let removed = self.runtimes.remove(index);
        self.selected_index = match self.selected_index {
            Some(selected) if selected == index => None,
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        removed.into()
    }

    pub fn selected_runtime(&self) -> Option<&RuntimeDescriptor> {
        self.selected_index.and_then(|index| self.runtimes.get(index))
    }

    #[cfg(test)]
    pub fn selection_is_consistent(&self) -> bool {
        match self.selected_index {
            Some(index) => index < self.runtimes.len(),
            None => true,
        }
    }
}
