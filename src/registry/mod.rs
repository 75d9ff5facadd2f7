//! Registry Module
//!
//! The instance registry and the host it relies on to run engines and own
//! the identity and table namespaces.

mod host;
mod instances;

pub use host::{HostedInstance, InstanceHost, LocalHost, TABLE_SUFFIX};
pub use instances::{InstanceRecord, InstanceRegistry};
