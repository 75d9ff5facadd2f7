//! Multi Cache - A multi-instance in-memory cache service
//!
//! Runs any number of named cache instances, each with its own freshness
//! policy (validity and evict windows) and optional on-demand refresh.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod options;
pub mod refresh;
pub mod registry;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use manager::CacheManager;
pub use options::CacheOptions;
pub use refresh::{RefreshProvider, RefreshTargets};
pub use tasks::spawn_sweep_task;
