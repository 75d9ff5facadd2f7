//! Cache Engine Module
//!
//! One engine per named cache instance. Mutations go through a single worker
//! task fed by a mailbox and are applied strictly in arrival order; fresh
//! reads go straight to the shared table under a read lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, Freshness, InstanceStats};
use crate::error::{CacheError, Result};
use crate::options::ResolvedOptions;
use crate::refresh::{RefreshProvider, RefreshTargets};

/// Default bound on a waiting get and on a single refresh invocation.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(5);

// == Engine Settings ==
/// Host-level settings shared by every engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Bound on a waiting get and on one refresh invocation
    pub refresh_timeout: Duration,
    /// Interval of the proactive sweep, `None` to rely on lazy expiry only
    pub sweep_interval: Option<Duration>,
    /// Targets available to deferred refresh providers
    pub targets: Arc<RefreshTargets>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            sweep_interval: None,
            targets: Arc::new(RefreshTargets::new()),
        }
    }
}

type Waiter = oneshot::Sender<Option<String>>;

/// A refresh in progress for one generation of a key.
struct InFlight {
    generation: u64,
    waiters: Vec<Waiter>,
}

// == Commands ==
enum Command {
    Set {
        key: String,
        value: String,
        options: ResolvedOptions,
        done: Option<oneshot::Sender<()>>,
    },
    Evict {
        key: String,
        done: Option<oneshot::Sender<()>>,
    },
    /// Remove an expired entry observed by a reader
    Purge {
        key: String,
        generation: u64,
        done: oneshot::Sender<()>,
    },
    Refresh {
        key: String,
        waiter: Option<Waiter>,
    },
    RefreshDone {
        key: String,
        generation: u64,
        result: anyhow::Result<String>,
    },
    Sweep {
        done: oneshot::Sender<usize>,
    },
    Stop {
        done: oneshot::Sender<()>,
    },
}

#[derive(Debug)]
struct Shared {
    name: String,
    table: RwLock<HashMap<String, CacheEntry>>,
    stats: InstanceStats,
}

/// What a reader saw for a key at request arrival.
enum Lookup {
    Absent,
    Fresh(String),
    Refreshable,
    Expired { generation: u64, stale: bool },
}

// == Cache Engine ==
/// Handle to a running cache instance. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CacheEngine {
    shared: Arc<Shared>,
    mailbox: mpsc::UnboundedSender<Command>,
    refresh_timeout: Duration,
}

impl CacheEngine {
    // == Spawn ==
    /// Starts the worker for instance `name` and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(name: impl Into<String>, settings: &EngineSettings) -> Self {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            name: name.into(),
            table: RwLock::new(HashMap::new()),
            stats: InstanceStats::new(),
        });

        let worker = Worker {
            shared: shared.clone(),
            mailbox: mailbox.downgrade(),
            targets: settings.targets.clone(),
            refresh_timeout: settings.refresh_timeout,
            pending: HashMap::new(),
            generation: 0,
            memory_bytes: 0,
        };
        tokio::spawn(worker.run(inbox));

        Self {
            shared,
            mailbox,
            refresh_timeout: settings.refresh_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    // == Get ==
    /// Reads `key`, applying the freshness rules.
    ///
    /// Fresh entries are served without touching the worker. A stale entry
    /// with a refresh provider triggers a refresh; with `wait_for_refresh`
    /// the call waits (bounded) for the new value, otherwise it reports
    /// not found straight away. Anything else expired is purged first.
    pub async fn get(&self, key: &str, wait_for_refresh: bool) -> Result<String> {
        let now = Instant::now();
        let lookup = {
            let table = self.shared.table.read().await;
            match table.get(key) {
                None => Lookup::Absent,
                Some(entry) => match entry.freshness_at(now) {
                    Freshness::Fresh => Lookup::Fresh(entry.value.clone()),
                    Freshness::Stale if entry.refresh.is_some() => Lookup::Refreshable,
                    freshness => Lookup::Expired {
                        generation: entry.generation,
                        stale: freshness == Freshness::Stale,
                    },
                },
            }
        };

        let stats = &self.shared.stats;
        match lookup {
            Lookup::Fresh(value) => {
                stats.record_hit();
                Ok(value)
            }
            Lookup::Refreshable => {
                stats.record_stale();
                match self.refresh(key, wait_for_refresh).await {
                    Some(value) => {
                        stats.record_hit();
                        Ok(value)
                    }
                    None => self.miss(key),
                }
            }
            Lookup::Expired { generation, stale } => {
                if stale {
                    stats.record_stale();
                }
                self.purge(key, generation).await;
                self.miss(key)
            }
            Lookup::Absent => self.miss(key),
        }
    }

    // == Set ==
    /// Installs a fresh entry for `key`, superseding any existing one.
    ///
    /// With `wait_until_done` the call returns once the entry is visible to
    /// the next get; otherwise it returns once the request is queued.
    pub async fn set(&self, key: String, value: String, options: &ResolvedOptions) -> Result<()> {
        let wait = options.wait_until_done;
        let options = options.clone();
        self.submit(wait, |done| Command::Set {
            key,
            value,
            options,
            done,
        })
        .await
    }

    // == Evict ==
    /// Removes `key` regardless of its freshness.
    pub async fn evict(&self, key: String, wait_until_done: bool) -> Result<()> {
        self.submit(wait_until_done, |done| Command::Evict { key, done })
            .await
    }

    // == Sweep ==
    /// Removes every expired entry, returning how many were dropped.
    pub async fn sweep(&self) -> Result<usize> {
        let (done, removed) = oneshot::channel();
        self.send(Command::Sweep { done })?;
        removed.await.map_err(|_| self.stopped())
    }

    // == Stats ==
    /// Snapshot of the instance counters. Never waits on the table.
    pub fn stats(&self) -> CacheStats {
        self.shared.stats.snapshot()
    }

    // == Shutdown ==
    /// Stops the worker after every queued command has been applied.
    pub async fn shutdown(&self) {
        let (done, stopped) = oneshot::channel();
        if self.send(Command::Stop { done }).is_ok() {
            let _ = stopped.await;
        }
    }

    pub fn is_running(&self) -> bool {
        !self.mailbox.is_closed()
    }

    /// Live references to this instance, the worker's own included.
    #[cfg(test)]
    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    // == Internals ==

    async fn submit<F>(&self, wait: bool, command: F) -> Result<()>
    where
        F: FnOnce(Option<oneshot::Sender<()>>) -> Command,
    {
        if !wait {
            return self.send(command(None));
        }
        let (done, committed) = oneshot::channel();
        self.send(command(Some(done)))?;
        committed.await.map_err(|_| self.stopped())
    }

    async fn refresh(&self, key: &str, wait: bool) -> Option<String> {
        if !wait {
            let _ = self.send(Command::Refresh {
                key: key.to_string(),
                waiter: None,
            });
            return None;
        }

        let (waiter, refreshed) = oneshot::channel();
        self.send(Command::Refresh {
            key: key.to_string(),
            waiter: Some(waiter),
        })
        .ok()?;

        match tokio::time::timeout(self.refresh_timeout, refreshed).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => None,
            Err(_) => {
                debug!(cache = %self.name(), key, "gave up waiting for refresh");
                None
            }
        }
    }

    async fn purge(&self, key: &str, generation: u64) {
        let (done, purged) = oneshot::channel();
        let command = Command::Purge {
            key: key.to_string(),
            generation,
            done,
        };
        if self.send(command).is_ok() {
            let _ = purged.await;
        }
    }

    fn miss<T>(&self, key: &str) -> Result<T> {
        self.shared.stats.record_miss();
        Err(CacheError::NotFound(key.to_string()))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.mailbox.send(command).map_err(|_| self.stopped())
    }

    fn stopped(&self) -> CacheError {
        CacheError::InvalidCacheName(self.shared.name.clone())
    }
}

// == Worker ==
/// The serialized coordinator for one instance. Sole writer of the table.
///
/// Its own mailbox handle is weak: the worker ends once every engine handle
/// (and every running refresh) is gone, even without a `Stop`.
struct Worker {
    shared: Arc<Shared>,
    mailbox: mpsc::WeakUnboundedSender<Command>,
    targets: Arc<RefreshTargets>,
    refresh_timeout: Duration,
    /// In-flight refreshes, keyed by entry key
    pending: HashMap<String, InFlight>,
    generation: u64,
    memory_bytes: u64,
}

impl Worker {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        debug!(cache = %self.shared.name, "cache worker started");

        while let Some(command) = inbox.recv().await {
            match command {
                Command::Set {
                    key,
                    value,
                    options,
                    done,
                } => {
                    self.set(key, value, &options).await;
                    notify(done);
                }
                Command::Evict { key, done } => {
                    self.remove(&key).await;
                    notify(done);
                }
                Command::Purge {
                    key,
                    generation,
                    done,
                } => {
                    self.purge(&key, generation).await;
                    let _ = done.send(());
                }
                Command::Refresh { key, waiter } => self.refresh(key, waiter).await,
                Command::RefreshDone {
                    key,
                    generation,
                    result,
                } => self.refresh_done(key, generation, result).await,
                Command::Sweep { done } => {
                    let removed = self.sweep().await;
                    let _ = done.send(removed);
                }
                Command::Stop { done } => {
                    self.clear().await;
                    let _ = done.send(());
                    break;
                }
            }
        }

        debug!(cache = %self.shared.name, "cache worker stopped");
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    async fn set(&mut self, key: String, value: String, options: &ResolvedOptions) {
        let generation = self.next_generation();
        let entry = CacheEntry::new(value, options, generation);
        self.install(key, entry).await;
    }

    async fn install(&mut self, key: String, entry: CacheEntry) {
        let mut table = self.shared.table.write().await;
        self.memory_bytes += entry.footprint(&key);
        if let Some(old) = table.get(&key) {
            self.memory_bytes = self.memory_bytes.saturating_sub(old.footprint(&key));
        }
        table.insert(key, entry);
        self.shared.stats.set_size(table.len(), self.memory_bytes);
    }

    async fn remove(&mut self, key: &str) -> bool {
        let mut table = self.shared.table.write().await;
        let removed = table.remove(key);
        if let Some(old) = &removed {
            self.memory_bytes = self.memory_bytes.saturating_sub(old.footprint(key));
            self.shared.stats.set_size(table.len(), self.memory_bytes);
        }
        removed.is_some()
    }

    /// Drops `key` if it is still the generation the reader saw and is no
    /// longer fresh. A newer write wins.
    async fn purge(&mut self, key: &str, generation: u64) {
        let expired = {
            let table = self.shared.table.read().await;
            table.get(key).is_some_and(|entry| {
                entry.generation == generation && entry.freshness() != Freshness::Fresh
            })
        };
        if expired && self.remove(key).await {
            self.shared.stats.record_evictions(1);
        }
    }

    async fn refresh(&mut self, key: String, waiter: Option<Waiter>) {
        let target = {
            let table = self.shared.table.read().await;
            match table.get(&key) {
                Some(entry) => match (entry.freshness(), &entry.refresh) {
                    (Freshness::Fresh, _) => Err(Some(entry.value.clone())),
                    (Freshness::Stale, Some(provider)) => Ok((provider.clone(), entry.generation)),
                    _ => Err(None),
                },
                None => Err(None),
            }
        };

        let (provider, generation) = match target {
            Ok(target) => target,
            Err(current) => {
                // Already refreshed or gone by the time the request got here.
                if let Some(waiter) = waiter {
                    let _ = waiter.send(current);
                }
                return;
            }
        };

        match self.pending.get_mut(&key) {
            Some(in_flight) if in_flight.generation == generation => {
                in_flight.waiters.extend(waiter);
            }
            superseded => {
                // A refresh started for an older write can no longer be
                // installed; its waiters move over to this one.
                let mut waiters: Vec<Waiter> = superseded
                    .map(|in_flight| std::mem::take(&mut in_flight.waiters))
                    .unwrap_or_default();
                waiters.extend(waiter);
                self.pending
                    .insert(key.clone(), InFlight { generation, waiters });
                self.spawn_refresh(key, generation, provider);
            }
        }
    }

    fn spawn_refresh(&mut self, key: String, generation: u64, provider: RefreshProvider) {
        let Some(mailbox) = self.mailbox.upgrade() else {
            // Every handle is gone; nobody is left to hear the result.
            self.pending.remove(&key);
            return;
        };
        let targets = self.targets.clone();
        let timeout = self.refresh_timeout;
        let cache = self.shared.name.clone();

        tokio::spawn(async move {
            let produce_key = key.clone();
            let mut produce =
                tokio::spawn(async move { provider.produce(&produce_key, &targets).await });

            let result = match tokio::time::timeout(timeout, &mut produce).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(anyhow!("refresh task failed: {}", join_error)),
                Err(_) => {
                    produce.abort();
                    Err(anyhow!("refresh timed out after {:?}", timeout))
                }
            };

            if mailbox
                .send(Command::RefreshDone {
                    key,
                    generation,
                    result,
                })
                .is_err()
            {
                debug!(cache = %cache, "refresh finished after instance stopped");
            }
        });
    }

    async fn refresh_done(&mut self, key: String, generation: u64, result: anyhow::Result<String>) {
        match self.pending.get(&key) {
            Some(in_flight) if in_flight.generation == generation => {}
            _ => {
                debug!(cache = %self.shared.name, key = %key, generation, "superseded refresh discarded");
                return;
            }
        }
        let waiters = self
            .pending
            .remove(&key)
            .map(|in_flight| in_flight.waiters)
            .unwrap_or_default();

        let current = {
            let table = self.shared.table.read().await;
            table.get(&key).cloned()
        };

        let outcome = match (result, current) {
            (Ok(value), Some(current)) if current.generation == generation => {
                let next = self.next_generation();
                self.install(key.clone(), current.refreshed(value.clone(), next))
                    .await;
                Some(value)
            }
            // Overwritten or removed while the refresh ran: answer with
            // whatever the table holds now, if it is servable.
            (Ok(_), current) => current
                .filter(|entry| entry.freshness() == Freshness::Fresh)
                .map(|entry| entry.value),
            (Err(err), _) => {
                warn!(cache = %self.shared.name, key = %key, error = %err, "refresh failed");
                None
            }
        };

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let mut table = self.shared.table.write().await;
        let expired: Vec<String> = table
            .iter()
            .filter(|(_, entry)| entry.freshness_at(now) == Freshness::Evicted)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(old) = table.remove(key) {
                self.memory_bytes = self.memory_bytes.saturating_sub(old.footprint(key));
            }
        }

        let count = expired.len();
        self.shared.stats.record_evictions(count as u64);
        self.shared.stats.set_size(table.len(), self.memory_bytes);
        count
    }

    async fn clear(&mut self) {
        let mut table = self.shared.table.write().await;
        let dropped = table.len();
        table.clear();
        self.memory_bytes = 0;
        self.shared.stats.set_size(0, 0);
        self.pending.clear();
        info!(cache = %self.shared.name, dropped, "cache instance cleared");
    }
}

fn notify(done: Option<oneshot::Sender<()>>) {
    if let Some(done) = done {
        let _ = done.send(());
    }
}
