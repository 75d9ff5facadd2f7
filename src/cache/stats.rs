//! Cache Statistics Module
//!
//! Tracks per-instance counters. Counters are atomics so that snapshots
//! never wait on the entry table.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Instance Stats ==
/// Live counters owned by one cache instance.
#[derive(Debug, Default)]
pub struct InstanceStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    evictions: AtomicU64,
    entries: AtomicU64,
    memory_bytes: AtomicU64,
}

impl InstanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A get landed on a stale entry.
    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Publishes the table size and footprint after a mutation.
    pub fn set_size(&self, entries: usize, memory_bytes: u64) {
        self.entries.store(entries as u64, Ordering::Relaxed);
        self.memory_bytes.store(memory_bytes, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed) as usize,
            memory_bytes: self.memory_bytes.load(Ordering::Relaxed),
        }
    }
}

// == Cache Stats ==
/// Read-only snapshot of an instance's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Gets that returned a value
    pub hits: u64,
    /// Gets that returned not found
    pub misses: u64,
    /// Gets that landed on a stale entry
    pub stale: u64,
    /// Entries removed by expiry (lazy purge or sweep)
    pub evictions: u64,
    /// Current number of entries
    pub entries: usize,
    /// Approximate bytes held by the entries
    pub memory_bytes: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no gets have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
