//! Instance Host
//!
//! The collaborator that actually runs cache instances: it spawns and stops
//! engines, binds their identities, and owns the storage-table namespace.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheEngine, EngineSettings};
use crate::tasks::spawn_sweep_task;

/// Suffix appended to an instance name to form its storage-table identifier.
pub const TABLE_SUFFIX: &str = "_table";

// == Instance Host ==
/// Lifecycle and namespace operations the registry depends on.
pub trait InstanceHost: Send + Sync {
    /// Starts the engine (and its table) for `name` and returns its handle.
    fn create_instance(&self, name: &str) -> CacheEngine;

    /// Detaches `name`'s running instance so the caller can wait for it to
    /// stop. Its identity and table stay claimed until `release_instance`.
    fn destroy_instance(&self, name: &str) -> Option<HostedInstance>;

    /// Frees `name`'s identity and table once its engine has stopped.
    fn release_instance(&self, name: &str);

    fn derive_table_identifier(&self, name: &str) -> String;

    fn list_all_table_identifiers(&self) -> HashSet<String>;

    /// Whether some running task already holds `name` as its identity.
    fn is_identity_bound(&self, name: &str) -> bool;
}

// == Hosted Instance ==
/// A running engine plus the background tasks attached to it.
///
/// Dropping it aborts the sweep, so an instance nobody shuts down still
/// lets its worker finish once the last engine handle goes.
#[derive(Debug)]
pub struct HostedInstance {
    engine: CacheEngine,
    sweeper: Option<JoinHandle<()>>,
}

impl HostedInstance {
    /// Stops the sweep and then the engine, once its queue has drained.
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
        self.engine.shutdown().await;
    }
}

impl Drop for HostedInstance {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

// == Local Host ==
/// In-process host: engines are tokio tasks, identities and tables are
/// process-wide name sets.
#[derive(Debug, Default)]
pub struct LocalHost {
    settings: EngineSettings,
    identities: RwLock<HashSet<String>>,
    tables: RwLock<HashSet<String>>,
    instances: Mutex<HashMap<String, HostedInstance>>,
}

impl LocalHost {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Binds `name` as the identity of something other than a cache
    /// instance. Returns false if it was already bound.
    pub fn bind_identity(&self, name: impl Into<String>) -> bool {
        self.identities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into())
    }

    pub fn release_identity(&self, name: &str) -> bool {
        self.identities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Claims a storage-table identifier for something other than a cache
    /// instance. Returns false if it already exists.
    pub fn reserve_table(&self, identifier: impl Into<String>) -> bool {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier.into())
    }

    pub fn release_table(&self, identifier: &str) -> bool {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier)
    }
}

impl InstanceHost for LocalHost {
    fn create_instance(&self, name: &str) -> CacheEngine {
        let engine = CacheEngine::spawn(name, &self.settings);
        let sweeper = self
            .settings
            .sweep_interval
            .map(|interval| spawn_sweep_task(engine.clone(), interval));

        self.bind_identity(name);
        self.reserve_table(self.derive_table_identifier(name));
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                HostedInstance {
                    engine: engine.clone(),
                    sweeper,
                },
            );

        info!(cache = %name, "Cache instance started");
        engine
    }

    fn destroy_instance(&self, name: &str) -> Option<HostedInstance> {
        let instance = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)?;

        info!(cache = %name, "Cache instance stopping");
        Some(instance)
    }

    fn release_instance(&self, name: &str) {
        self.release_table(&self.derive_table_identifier(name));
        self.release_identity(name);
    }

    fn derive_table_identifier(&self, name: &str) -> String {
        format!("{name}{TABLE_SUFFIX}")
    }

    fn list_all_table_identifiers(&self) -> HashSet<String> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_identity_bound(&self, name: &str) -> bool {
        self.identities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_binds_identity_and_table() {
        let host = LocalHost::default();
        let engine = host.create_instance("users");

        assert!(engine.is_running());
        assert!(host.is_identity_bound("users"));
        assert!(host.list_all_table_identifiers().contains("users_table"));
    }

    #[tokio::test]
    async fn test_destroy_releases_namespaces() {
        let host = LocalHost::default();
        let engine = host.create_instance("users");

        let instance = host.destroy_instance("users").unwrap();
        // Namespaces stay claimed while the engine is still running.
        assert!(host.is_identity_bound("users"));
        assert!(host.list_all_table_identifiers().contains("users_table"));

        instance.shutdown().await;
        assert!(!engine.is_running());
        assert!(host.is_identity_bound("users"));

        host.release_instance("users");
        assert!(!host.is_identity_bound("users"));
        assert!(host.list_all_table_identifiers().is_empty());
        assert!(host.destroy_instance("users").is_none());
    }

    #[test]
    fn test_foreign_identities_and_tables() {
        let host = LocalHost::default();
        assert!(host.bind_identity("logger"));
        assert!(!host.bind_identity("logger"));
        assert!(host.reserve_table("sessions_table"));

        assert!(host.is_identity_bound("logger"));
        assert!(host.list_all_table_identifiers().contains("sessions_table"));

        assert!(host.release_identity("logger"));
        assert!(host.release_table("sessions_table"));
        assert!(!host.is_identity_bound("logger"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_attached_when_configured() {
        let host = LocalHost::new(EngineSettings {
            sweep_interval: Some(std::time::Duration::from_millis(100)),
            ..EngineSettings::default()
        });
        host.create_instance("swept");

        let instance = host.destroy_instance("swept").unwrap();
        assert!(instance.sweeper.is_some());
        instance.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_host_aborts_sweepers() {
        let host = LocalHost::new(EngineSettings {
            sweep_interval: Some(std::time::Duration::from_millis(100)),
            ..EngineSettings::default()
        });
        let engine = host.create_instance("orphan");
        drop(host);

        for _ in 0..100 {
            if engine.handle_count() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        // Only this handle and the worker itself remain.
        assert_eq!(engine.handle_count(), 2);
    }
}
