//! Background Tasks Module
//!
//! Contains background tasks that run periodically while an instance is up.
//!
//! # Tasks
//! - Sweep: Removes evicted entries from one instance at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
