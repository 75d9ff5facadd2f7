//! Expiry Sweep Task
//!
//! Background task that periodically removes evicted entries from one cache
//! instance. Lazy expiry on access already keeps reads correct; the sweep
//! only reclaims memory for keys nobody reads.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheEngine;

/// Spawns a background task that sweeps `engine` every `interval`.
///
/// The sweep goes through the engine's mailbox like any other mutation, so
/// it never races a set or evict. The task ends on its own once the engine
/// has stopped; the returned handle lets the owner abort it earlier.
pub fn spawn_sweep_task(engine: CacheEngine, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(
            cache = %engine.name(),
            "Starting expiry sweep with interval of {:?}",
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = match engine.sweep().await {
                Ok(removed) => removed,
                Err(_) => break,
            };

            if removed > 0 {
                info!(cache = %engine.name(), "Expiry sweep: removed {} evicted entries", removed);
            } else {
                debug!(cache = %engine.name(), "Expiry sweep: no evicted entries found");
            }
        }

        debug!(cache = %engine.name(), "Expiry sweep stopped");
    })
}
