//! Cache Manager
//!
//! The caller-facing handle. Starting and stopping instances is serialized
//! through one admin lock; get/set/evict resolve their options against the
//! instance defaults and go straight to the addressed engine.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::{CacheEngine, CacheStats, EngineSettings};
use crate::error::{CacheError, Result};
use crate::options::{validate, CacheOptions, ResolvedOptions};
use crate::registry::{InstanceHost, InstanceRegistry, LocalHost};

struct Inner {
    registry: InstanceRegistry,
    admin: Mutex<()>,
}

// == Cache Manager ==
/// Cheap to clone; every clone addresses the same set of instances.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl CacheManager {
    pub fn new(host: Arc<dyn InstanceHost>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: InstanceRegistry::new(host),
                admin: Mutex::new(()),
            }),
        }
    }

    /// Manager backed by an in-process [`LocalHost`].
    pub fn local(settings: EngineSettings) -> Self {
        Self::new(Arc::new(LocalHost::new(settings)))
    }

    // == Start Cache ==
    /// Registers and starts instance `name` with `options` as its defaults.
    pub async fn start_cache(&self, name: &str, options: CacheOptions) -> Result<()> {
        let _admin = self.inner.admin.lock().await;
        self.inner.registry.register(name, &options)
    }

    // == Stop Cache ==
    /// Stops instance `name`. Once this returns the name can be reused.
    pub async fn stop_cache(&self, name: &str) -> Result<()> {
        let _admin = self.inner.admin.lock().await;
        self.inner.registry.unregister(name).await?;
        info!(cache = %name, "Cache instance stopped");
        Ok(())
    }

    // == Get ==
    pub async fn get(&self, name: &str, key: &str, options: &CacheOptions) -> Result<String> {
        let (resolved, engine) = self.resolve(name, options)?;
        engine.get(key, resolved.wait_for_refresh).await
    }

    // == Set ==
    pub async fn set(
        &self,
        name: &str,
        key: impl Into<String>,
        value: impl Into<String>,
        options: &CacheOptions,
    ) -> Result<()> {
        let (resolved, engine) = self.resolve(name, options)?;
        engine.set(key.into(), value.into(), &resolved).await
    }

    // == Evict ==
    pub async fn evict(&self, name: &str, key: impl Into<String>, options: &CacheOptions) -> Result<()> {
        let (resolved, engine) = self.resolve(name, options)?;
        engine.evict(key.into(), resolved.wait_until_done).await
    }

    // == Stats ==
    pub fn get_stats(&self, name: &str) -> Result<CacheStats> {
        self.inner
            .registry
            .lookup(name)
            .map(|record| record.engine.stats())
            .ok_or_else(|| CacheError::InvalidCacheName(name.to_string()))
    }

    /// Names of the running instances, sorted.
    pub fn cache_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    /// Defaults an instance was started with.
    pub fn defaults(&self, name: &str) -> Result<ResolvedOptions> {
        self.inner
            .registry
            .lookup_defaults(name)
            .ok_or_else(|| CacheError::InvalidCacheName(name.to_string()))
    }

    // == Startup List ==
    /// Starts each configured instance in order, stopping at the first
    /// failure.
    pub async fn start_all(&self, caches: Vec<(String, CacheOptions)>) -> Result<()> {
        for (name, options) in caches {
            self.start_cache(&name, options).await?;
        }
        Ok(())
    }

    // == Shutdown ==
    /// Stops every running instance.
    pub async fn shutdown(&self) {
        for name in self.cache_names() {
            if let Err(err) = self.stop_cache(&name).await {
                warn!(cache = %name, error = %err, "Failed to stop cache instance");
            }
        }
    }

    fn resolve(&self, name: &str, options: &CacheOptions) -> Result<(ResolvedOptions, CacheEngine)> {
        let record = self.inner.registry.lookup(name);
        let resolved = validate(options, record.as_ref().map(|record| &record.defaults))
            .map_err(|err| CacheError::from_option_error(err, name))?;
        let engine = record
            .map(|record| record.engine)
            .ok_or_else(|| CacheError::InvalidCacheName(name.to_string()))?;
        Ok((resolved, engine))
    }
}
