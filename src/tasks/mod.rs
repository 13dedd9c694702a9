//! Background Tasks Module
//!
//! Tasks the binary runs against a shared provider cache.
//!
//! # Tasks
//! - Workload: get-or-create provider lookups, the way a token validator
//!   uses the cache

mod workload;

pub use workload::{spawn_workload, WorkerReport, WorkloadSettings};
