//! Cache Module
//!
//! Per-instance storage: entries and their freshness, live counters, and
//! the engine that serializes mutations for one named instance.

mod engine;
mod entry;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::{CacheEngine, EngineSettings, DEFAULT_REFRESH_TIMEOUT};
pub use entry::{CacheEntry, Freshness};
pub use stats::{CacheStats, InstanceStats};
