//! Cache Entry Module
//!
//! Defines individual cache entries and their freshness state.

use std::mem;
use std::time::Duration;

use tokio::time::Instant;

use crate::options::ResolvedOptions;
use crate::refresh::RefreshProvider;

// == Freshness ==
/// Freshness of an entry at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// age <= validity
    Fresh,
    /// validity < age <= validity + evict
    Stale,
    /// age > validity + evict
    Evicted,
}

// == Cache Entry ==
/// A stored value together with the policy it was written under.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Write (or last refresh) time
    pub created_at: Instant,
    /// Fresh window measured from `created_at`
    pub validity: Duration,
    /// Stale window following the fresh window
    pub evict: Duration,
    /// Provider used to re-compute the value once stale
    pub refresh: Option<RefreshProvider>,
    /// Bumped on every write so late refresh results can detect they were superseded
    pub generation: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a fresh entry written now under `options`.
    pub fn new(value: String, options: &ResolvedOptions, generation: u64) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            validity: options.validity,
            evict: options.evict,
            refresh: options.refresh_callback.clone(),
            generation,
        }
    }

    // == Refreshed ==
    /// Returns a fresh copy carrying `value`, keeping the entry's policy.
    pub fn refreshed(&self, value: String, generation: u64) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            validity: self.validity,
            evict: self.evict,
            refresh: self.refresh.clone(),
            generation,
        }
    }

    // == Freshness ==
    /// Freshness relative to `now`.
    ///
    /// Boundaries are inclusive on the lower state: an entry whose age equals
    /// its validity is still fresh.
    pub fn freshness_at(&self, now: Instant) -> Freshness {
        let age = now.saturating_duration_since(self.created_at);
        if age <= self.validity {
            Freshness::Fresh
        } else if age <= self.validity + self.evict {
            Freshness::Stale
        } else {
            Freshness::Evicted
        }
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness_at(Instant::now())
    }

    // == Footprint ==
    /// Approximate bytes held by this entry under `key`.
    pub fn footprint(&self, key: &str) -> u64 {
        (key.len() + self.value.len() + mem::size_of::<Self>()) as u64
    }
}
