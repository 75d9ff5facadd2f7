//! Instance Registry
//!
//! Maps each cache instance name to its validated default options and its
//! engine handle, and enforces name uniqueness across the registry, the
//! host's identity namespace and its table namespace.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::cache::CacheEngine;
use crate::error::{CacheError, Result};
use crate::options::{validate, CacheOptions, ResolvedOptions};
use crate::registry::InstanceHost;

// == Instance Record ==
/// What the registry keeps per instance.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub defaults: ResolvedOptions,
    pub engine: CacheEngine,
}

// == Instance Registry ==
/// Table of running instances.
///
/// Lookups take a shared read lock and may run from any number of callers.
/// `register` and `unregister` are not serialized here; the caller must
/// run them one at a time.
pub struct InstanceRegistry {
    host: Arc<dyn InstanceHost>,
    table: RwLock<HashMap<String, InstanceRecord>>,
}

impl InstanceRegistry {
    pub fn new(host: Arc<dyn InstanceHost>) -> Self {
        Self {
            host,
            table: RwLock::new(HashMap::new()),
        }
    }

    // == Availability ==
    /// A name is usable only if it is unknown to the registry, bound to no
    /// running identity, and its derived table does not exist.
    pub fn is_available(&self, name: &str) -> bool {
        if name.is_empty() || self.is_registered(name) {
            return false;
        }
        if self.host.is_identity_bound(name) {
            return false;
        }
        let table = self.host.derive_table_identifier(name);
        !self.host.list_all_table_identifiers().contains(&table)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.read_table().contains_key(name)
    }

    // == Register ==
    /// Validates `proposed` against the global fallbacks, records it and
    /// asks the host to start the instance.
    pub fn register(&self, name: &str, proposed: &CacheOptions) -> Result<()> {
        if !self.is_available(name) {
            return Err(CacheError::InvalidCacheName(name.to_string()));
        }

        let defaults = validate(proposed, Some(&ResolvedOptions::default()))
            .map_err(|err| CacheError::from_option_error(err, name))?;

        let engine = self.host.create_instance(name);
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), InstanceRecord { defaults, engine });
        Ok(())
    }

    // == Unregister ==
    /// Stops the instance, forgets the name, and only then lets the host
    /// release its identity and table.
    ///
    /// The record stays visible until the engine has stopped; calls routed
    /// to it in the meantime see a stopped engine and report the name as
    /// invalid. The name cannot be claimed again before the host releases it.
    pub async fn unregister(&self, name: &str) -> Result<()> {
        if !self.is_registered(name) {
            return Err(CacheError::InvalidCacheName(name.to_string()));
        }

        if let Some(instance) = self.host.destroy_instance(name) {
            instance.shutdown().await;
        }

        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        self.host.release_instance(name);
        Ok(())
    }

    // == Lookups ==
    pub fn lookup_defaults(&self, name: &str) -> Option<ResolvedOptions> {
        self.read_table().get(name).map(|record| record.defaults.clone())
    }

    pub fn lookup(&self, name: &str) -> Option<InstanceRecord> {
        self.read_table().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_table().keys().cloned().collect();
        names.sort();
        names
    }

    fn read_table(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, InstanceRecord>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }
}
