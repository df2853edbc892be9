use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::model::{RuntimeDescriptor, RuntimeSource, ScopeConfig};
use super::store::ScopeStore;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::validator::normalize_path;
use crate::core::java::{RuntimeProbe, RuntimeValidator};

/// Scope id of the launcher-wide default configuration. It always exists
/// and is never deletable.
pub const GLOBAL_SCOPE: &str = "global";

/// Cap on concurrently running version-query child processes during a scan.
const VALIDATION_CONCURRENCY: usize = 4;

const SAVE_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// The Java runtime registry: merges probed and persisted runtimes per
/// configuration scope, tracks the selection, and mediates user additions.
///
/// Operations on one scope are serialized behind that scope's mutex for the
/// whole read-modify-persist sequence; operations on different scopes run
/// in parallel. The registry-wide lock only guards the scope map itself.
pub struct RuntimeRegistry {
    store: ScopeStore,
    probe: RuntimeProbe,
    validator: RuntimeValidator,
    scopes: Mutex<HashMap<String, Arc<Mutex<Option<ScopeConfig>>>>>,
}

impl RuntimeRegistry {
    pub fn new(store: ScopeStore, probe: RuntimeProbe, validator: RuntimeValidator) -> Self {
        Self {
            store,
            probe,
            validator,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Runtimes and selection for a scope. A scope seen for the first time
    /// (no usable persisted record) is seeded from a fresh probe; an
    /// existing record is returned as-is; re-discovery is explicit via
    /// [`refresh`](Self::refresh) so repeated reads stay cheap.
    #[instrument(skip(self))]
    pub async fn get_scope(&self, scope_id: &str) -> LauncherResult<ScopeConfig> {
        let handle = self.scope_handle(scope_id).await;
        let mut slot = handle.lock().await;
        self.load_or_seed(scope_id, &mut slot).await
    }

    /// Re-run discovery and merge the result into the scope. Existing
    /// entries keep their positions (so the selection index stays stable)
    /// and entries that disappeared from disk are retained; removal is only
    /// ever explicit.
    #[instrument(skip(self))]
    pub async fn refresh(&self, scope_id: &str) -> LauncherResult<ScopeConfig> {
        let handle = self.scope_handle(scope_id).await;
        let mut slot = handle.lock().await;
        // Refresh runs its own discovery pass, so a never-seen scope starts
        // from an empty config here instead of the seeding path.
        let mut config = match slot.as_ref() {
            Some(config) => config.clone(),
            None => match self.store.load(scope_id).await? {
                Some(persisted) => persisted,
                None => ScopeConfig::new(scope_id),
            },
        };

        let was_empty = config.runtimes.is_empty();
        for descriptor in self.discover_validated().await {
            if config.position_of(&descriptor.path).is_none() {
                config.push(descriptor);
            }
        }
        if was_empty && config.selected_index.is_none() && !config.runtimes.is_empty() {
            let _ = config.select(0);
        }

        *slot = Some(config.clone());
        self.persist(&config).await?;
        Ok(config)
    }

    /// Change the selected runtime of a scope.
    pub async fn select(&self, scope_id: &str, index: usize) -> LauncherResult<()> {
        let handle = self.scope_handle(scope_id).await;
        let mut slot = handle.lock().await;
        let mut config = self.load_or_seed(scope_id, &mut slot).await?;

        if !config.select(index) {
            return Err(LauncherError::OutOfRange {
                scope_id: scope_id.to_string(),
                index,
                len: config.runtimes.len(),
            });
        }

        *slot = Some(config.clone());
        self.persist(&config).await?;
        Ok(())
    }

    /// Validate `path` and register it as a user-added runtime, selecting
    /// it. Idempotent on the normalized path: re-adding a known path
    /// selects and returns the existing descriptor without duplicating the
    /// entry. On rejection the scope is left untouched.
    #[instrument(skip(self))]
    pub async fn add_path(&self, scope_id: &str, path: &Path) -> LauncherResult<RuntimeDescriptor> {
        let handle = self.scope_handle(scope_id).await;
        let mut slot = handle.lock().await;
        let mut config = self.load_or_seed(scope_id, &mut slot).await?;

        let normalized = normalize_path(path);
        let position = match config.position_of(&normalized) {
            Some(existing) => existing,
            None => {
                let descriptor = self
                    .validator
                    .validate(&normalized, RuntimeSource::UserAdded)
                    .await?;
                config.push(descriptor)
            }
        };
        let selected = config.select(position);
        debug_assert!(selected);

        let descriptor = config.runtimes[position].clone();
        *slot = Some(config.clone());
        self.persist(&config).await?;
        Ok(descriptor)
    }

    /// Remove the runtime at `index`. Removing the selected entry leaves
    /// the scope unselected; the caller must `select` explicitly
    /// afterwards.
    pub async fn remove(&self, scope_id: &str, index: usize) -> LauncherResult<()> {
        let handle = self.scope_handle(scope_id).await;
        let mut slot = handle.lock().await;
        let mut config = self.load_or_seed(scope_id, &mut slot).await?;

        if config.remove(index).is_none() {
            return Err(LauncherError::OutOfRange {
                scope_id: scope_id.to_string(),
                index,
                len: config.runtimes.len(),
            });
        }

        *slot = Some(config.clone());
        self.persist(&config).await?;
        Ok(())
    }

    /// Destroy a modpack scope's record. The global scope is permanent.
    pub async fn delete_scope(&self, scope_id: &str) -> LauncherResult<()> {
        if scope_id == GLOBAL_SCOPE {
            return Err(LauncherError::Other(
                "The global scope cannot be deleted".to_string(),
            ));
        }

        let handle = self.scope_handle(scope_id).await;
        let mut slot = handle.lock().await;
        // The map entry stays put so every operation on this scope id keeps
        // sharing one mutex; clearing the slot is what marks the scope gone
        // in memory.
        *slot = None;
        self.store.delete(scope_id).await
    }

    /// Probe for candidates and validate them through a bounded worker
    /// pool, preserving probe order. Failures are dropped; discovery never
    /// fails outward.
    async fn discover_validated(&self) -> Vec<RuntimeDescriptor> {
        let probe = self.probe.clone();
        let candidates = tokio::task::spawn_blocking(move || probe.discover())
            .await
            .unwrap_or_default();

        let mut validated: Vec<(usize, RuntimeDescriptor)> = stream::iter(
            candidates.into_iter().enumerate(),
        )
        .map(|(index, candidate)| {
            let validator = self.validator.clone();
            async move {
                match validator
                    .validate(&candidate, RuntimeSource::Discovered)
                    .await
                {
                    Ok(descriptor) => Some((index, descriptor)),
                    Err(rejection) => {
                        info!("Skipping candidate {:?}: {}", candidate, rejection);
                        None
                    }
                }
            }
        })
        .buffer_unordered(VALIDATION_CONCURRENCY)
        .filter_map(|result| async move { result })
        .collect()
        .await;

        validated.sort_by_key(|(index, _)| *index);
        validated
            .into_iter()
            .map(|(_, descriptor)| descriptor)
            .collect()
    }

    /// Resolve the config for a scope: in memory first, then the store,
    /// and for a scope never seen before the lazy first-creation path: a
    /// fresh probe seed with the first validated runtime selected,
    /// persisted immediately. Callers must hold the scope's lock.
    async fn load_or_seed(
        &self,
        scope_id: &str,
        slot: &mut Option<ScopeConfig>,
    ) -> LauncherResult<ScopeConfig> {
        if let Some(config) = slot.as_ref() {
            return Ok(config.clone());
        }

        if let Some(persisted) = self.store.load(scope_id).await? {
            *slot = Some(persisted.clone());
            return Ok(persisted);
        }

        let mut config = ScopeConfig::new(scope_id);
        for descriptor in self.discover_validated().await {
            if config.position_of(&descriptor.path).is_none() {
                config.push(descriptor);
            }
        }
        if !config.runtimes.is_empty() {
            let _ = config.select(0);
        }
        info!(
            "Seeded scope '{}' with {} discovered runtime(s)",
            scope_id,
            config.runtimes.len()
        );

        *slot = Some(config.clone());
        self.persist(&config).await?;
        Ok(config)
    }

    async fn scope_handle(&self, scope_id: &str) -> Arc<Mutex<Option<ScopeConfig>>> {
        let mut scopes = self.scopes.lock().await;
        scopes
            .entry(scope_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Persist a scope record, retrying once after a short backoff. A
    /// second failure is surfaced as a storage error while the in-memory
    /// state stays usable for the session.
    async fn persist(&self, config: &ScopeConfig) -> LauncherResult<()> {
        if let Err(first) = self.store.save(config).await {
            warn!(
                "Saving scope '{}' failed, retrying once: {}",
                config.scope_id, first
            );
            tokio::time::sleep(SAVE_RETRY_BACKOFF).await;
            if let Err(second) = self.store.save(config).await {
                return Err(LauncherError::Storage {
                    scope_id: config.scope_id.clone(),
                    reason: second.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::core::java::JavaVersion;

    fn registry_at(dir: &Path, probe_roots: Vec<PathBuf>) -> RuntimeRegistry {
        RuntimeRegistry::new(
            ScopeStore::new(dir.join("scopes")),
            RuntimeProbe::with_roots(probe_roots),
            RuntimeValidator::new(),
        )
    }

    fn descriptor(path: &str) -> RuntimeDescriptor {
        RuntimeDescriptor {
            path: PathBuf::from(path),
            version: JavaVersion::parse("17.0.8").unwrap(),
            source: RuntimeSource::Discovered,
        }
    }

    async fn seed_store(dir: &Path, scope_id: &str, paths: &[&str], selected: Option<usize>) {
        let mut config = ScopeConfig::new(scope_id);
        for path in paths {
            config.push(descriptor(path));
        }
        config.selected_index = selected;
        ScopeStore::new(dir.join("scopes"))
            .save(&config)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn first_launch_with_no_runtimes_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_at(dir.path(), vec![]);

        let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
        assert!(scope.runtimes.is_empty());
        assert_eq!(scope.selected_index, None);

        // The empty seed is persisted, so the next launch skips discovery.
        let persisted = ScopeStore::new(dir.path().join("scopes"))
            .load(GLOBAL_SCOPE)
            .await
            .unwrap()
            .unwrap();
        assert!(persisted.runtimes.is_empty());
    }

    #[tokio::test]
    async fn persisted_scope_is_returned_without_reprobing() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(dir.path(), "pack-1", &["/opt/jdk17/bin/java"], Some(0)).await;

        let registry = registry_at(dir.path(), vec![]);
        let scope = registry.get_scope("pack-1").await.unwrap();
        assert_eq!(scope.runtimes.len(), 1);
        assert_eq!(scope.selected_index, Some(0));
    }

    #[tokio::test]
    async fn select_updates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(
            dir.path(),
            GLOBAL_SCOPE,
            &["/opt/jdk8/bin/java", "/opt/jdk17/bin/java"],
            Some(0),
        )
        .await;

        let registry = registry_at(dir.path(), vec![]);
        registry.select(GLOBAL_SCOPE, 1).await.unwrap();

        let reloaded = ScopeStore::new(dir.path().join("scopes"))
            .load(GLOBAL_SCOPE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.selected_index, Some(1));
    }

    #[tokio::test]
    async fn select_out_of_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(dir.path(), GLOBAL_SCOPE, &["/opt/jdk17/bin/java"], Some(0)).await;

        let registry = registry_at(dir.path(), vec![]);
        let error = registry.select(GLOBAL_SCOPE, 5).await.unwrap_err();
        assert!(matches!(error, LauncherError::OutOfRange { index: 5, .. }));

        let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
        assert_eq!(scope.selected_index, Some(0));
    }

    #[tokio::test]
    async fn remove_selected_entry_leaves_scope_unselected() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(
            dir.path(),
            GLOBAL_SCOPE,
            &["/opt/jdk8/bin/java", "/opt/jdk17/bin/java"],
            Some(1),
        )
        .await;

        let registry = registry_at(dir.path(), vec![]);
        registry.remove(GLOBAL_SCOPE, 1).await.unwrap();

        let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
        assert_eq!(scope.runtimes.len(), 1);
        assert_eq!(scope.selected_index, None);
    }

    #[tokio::test]
    async fn remove_below_selection_shifts_it() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(
            dir.path(),
            GLOBAL_SCOPE,
            &["/opt/jdk8/bin/java", "/opt/jdk17/bin/java"],
            Some(1),
        )
        .await;

        let registry = registry_at(dir.path(), vec![]);
        registry.remove(GLOBAL_SCOPE, 0).await.unwrap();

        let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
        assert_eq!(scope.runtimes.len(), 1);
        assert_eq!(scope.selected_index, Some(0));
        assert_eq!(scope.runtimes[0].path, Path::new("/opt/jdk17/bin/java"));
    }

    #[tokio::test]
    async fn delete_scope_refuses_global_and_removes_packs() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(dir.path(), "pack-9", &[], None).await;

        let registry = registry_at(dir.path(), vec![]);
        assert!(registry.delete_scope(GLOBAL_SCOPE).await.is_err());

        registry.delete_scope("pack-9").await.unwrap();
        assert!(matches!(
            registry.delete_scope("pack-9").await,
            Err(LauncherError::ScopeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleted_scope_keeps_its_mutex_for_later_operations() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(dir.path(), "pack-7", &["/opt/jdk17/bin/java"], Some(0)).await;

        let registry = registry_at(dir.path(), vec![]);
        let before = registry.scope_handle("pack-7").await;
        registry.delete_scope("pack-7").await.unwrap();

        // Operations on the same scope id must keep serializing on the same
        // lock after deletion; a fresh mutex would let two read-modify-persist
        // sequences interleave.
        let after = registry.scope_handle("pack-7").await;
        assert!(Arc::ptr_eq(&before, &after));

        // The record is gone; the next read re-creates the scope fresh
        // instead of resurrecting the deleted entries.
        let scope = registry.get_scope("pack-7").await.unwrap();
        assert!(scope.runtimes.is_empty());
        assert_eq!(scope.selected_index, None);
    }

    #[tokio::test]
    async fn concurrent_operations_keep_selection_valid() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<String> = (0..8).map(|i| format!("/opt/jdk{i}/bin/java")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        seed_store(dir.path(), GLOBAL_SCOPE, &refs, Some(0)).await;

        let registry = Arc::new(registry_at(dir.path(), vec![]));
        let mut tasks = Vec::new();
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let _ = registry.select(GLOBAL_SCOPE, i % 4).await;
                } else {
                    let _ = registry.remove(GLOBAL_SCOPE, i % 3).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
        assert!(scope.selection_is_consistent());
    }

    #[cfg(unix)]
    mod with_fake_runtimes {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn install_fake_java(root: &Path, name: &str, version_line: &str) -> PathBuf {
            let bin = root.join(name).join("bin");
            std::fs::create_dir_all(&bin).unwrap();
            let java = bin.join("java");
            std::fs::write(
                &java,
                format!("#!/bin/sh\necho '{version_line}' >&2\n"),
            )
            .unwrap();
            let mut perms = std::fs::metadata(&java).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&java, perms).unwrap();
            java
        }

        #[tokio::test]
        async fn discovery_seeds_scope_with_first_valid_selected() {
            let dir = tempfile::tempdir().unwrap();
            let jvm_root = dir.path().join("jvm");
            install_fake_java(&jvm_root, "jdk-17", "openjdk version \"17.0.8\" 2023-07-18");

            let registry = registry_at(dir.path(), vec![jvm_root]);
            let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();

            assert_eq!(scope.runtimes.len(), 1);
            assert_eq!(scope.selected_index, Some(0));
            assert_eq!(scope.runtimes[0].source, RuntimeSource::Discovered);
            assert_eq!(scope.runtimes[0].version.major, 17);
        }

        #[tokio::test]
        async fn get_scope_does_not_reprobe_when_persisted() {
            let dir = tempfile::tempdir().unwrap();
            seed_store(dir.path(), GLOBAL_SCOPE, &["/opt/stale/bin/java"], Some(0)).await;

            let jvm_root = dir.path().join("jvm");
            install_fake_java(&jvm_root, "jdk-21", "openjdk version \"21.0.2\" 2024-01-16");

            let registry = registry_at(dir.path(), vec![jvm_root]);
            let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
            // The persisted record wins; the probed runtime only appears
            // after an explicit refresh.
            assert_eq!(scope.runtimes.len(), 1);
            assert_eq!(scope.runtimes[0].path, Path::new("/opt/stale/bin/java"));
        }

        #[tokio::test]
        async fn refresh_merges_new_and_retains_stale_entries() {
            let dir = tempfile::tempdir().unwrap();
            seed_store(dir.path(), GLOBAL_SCOPE, &["/opt/stale/bin/java"], Some(0)).await;

            let jvm_root = dir.path().join("jvm");
            install_fake_java(&jvm_root, "jdk-21", "openjdk version \"21.0.2\" 2024-01-16");

            let registry = registry_at(dir.path(), vec![jvm_root]);
            let scope = registry.refresh(GLOBAL_SCOPE).await.unwrap();

            assert_eq!(scope.runtimes.len(), 2);
            // Existing entries keep their positions so the selection stays
            // stable; the stale path is retained until removed explicitly.
            assert_eq!(scope.runtimes[0].path, Path::new("/opt/stale/bin/java"));
            assert_eq!(scope.selected_index, Some(0));
            assert_eq!(scope.runtimes[1].version.major, 21);
        }

        #[tokio::test]
        async fn refresh_is_idempotent_on_paths() {
            let dir = tempfile::tempdir().unwrap();
            let jvm_root = dir.path().join("jvm");
            install_fake_java(&jvm_root, "jdk-17", "openjdk version \"17.0.8\" 2023-07-18");

            let registry = registry_at(dir.path(), vec![jvm_root]);
            let first = registry.refresh(GLOBAL_SCOPE).await.unwrap();
            let second = registry.refresh(GLOBAL_SCOPE).await.unwrap();
            assert_eq!(first.runtimes.len(), 1);
            assert_eq!(second.runtimes.len(), 1);
        }

        #[tokio::test]
        async fn mutating_a_never_seen_scope_seeds_it_from_discovery() {
            let dir = tempfile::tempdir().unwrap();
            let jvm_root = dir.path().join("jvm");
            install_fake_java(&jvm_root, "jdk-17", "openjdk version \"17.0.8\" 2023-07-18");

            let registry = registry_at(dir.path(), vec![jvm_root]);
            // First touch is a mutation, not a read: the scope still gets
            // the probe seed before the operation applies.
            registry.select("fresh-pack", 0).await.unwrap();

            let scope = registry.get_scope("fresh-pack").await.unwrap();
            assert_eq!(scope.runtimes.len(), 1);
            assert_eq!(scope.selected_index, Some(0));
            assert_eq!(scope.runtimes[0].source, RuntimeSource::Discovered);
        }

        #[tokio::test]
        async fn add_path_registers_selects_and_is_idempotent() {
            let dir = tempfile::tempdir().unwrap();
            let java = install_fake_java(
                &dir.path().join("manual"),
                "jdk-17",
                "openjdk version \"17.0.8\" 2023-07-18",
            );

            let registry = registry_at(dir.path(), vec![]);
            let added = registry.add_path(GLOBAL_SCOPE, &java).await.unwrap();
            assert_eq!(added.source, RuntimeSource::UserAdded);

            let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
            assert_eq!(scope.runtimes.len(), 1);
            assert_eq!(scope.selected_index, Some(0));

            let again = registry.add_path(GLOBAL_SCOPE, &java).await.unwrap();
            assert_eq!(again.path, added.path);
            let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
            assert_eq!(scope.runtimes.len(), 1);
        }

        #[tokio::test]
        async fn add_path_rejection_leaves_scope_untouched() {
            let dir = tempfile::tempdir().unwrap();
            seed_store(dir.path(), GLOBAL_SCOPE, &["/opt/jdk17/bin/java"], Some(0)).await;

            let registry = registry_at(dir.path(), vec![]);
            let error = registry
                .add_path(GLOBAL_SCOPE, Path::new("/nonexistent/java"))
                .await
                .unwrap_err();
            assert!(matches!(error, LauncherError::Rejected(_)));

            let scope = registry.get_scope(GLOBAL_SCOPE).await.unwrap();
            assert_eq!(scope.runtimes.len(), 1);
            assert_eq!(scope.selected_index, Some(0));
        }

        #[tokio::test]
        async fn scopes_are_independent() {
            let dir = tempfile::tempdir().unwrap();
            let java = install_fake_java(
                &dir.path().join("manual"),
                "jdk-17",
                "openjdk version \"17.0.8\" 2023-07-18",
            );

            let registry = registry_at(dir.path(), vec![]);
            registry.add_path("pack-a", &java).await.unwrap();

            let untouched = registry.get_scope("pack-b").await.unwrap();
            assert!(untouched.runtimes.is_empty());

            let pack_a = registry.get_scope("pack-a").await.unwrap();
            assert_eq!(pack_a.runtimes.len(), 1);
        }
    }
}
