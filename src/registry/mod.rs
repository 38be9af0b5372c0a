//! # Task Registry
//!
//! In-memory store of every crawler task known to the process.
//!
//! ## Overview
//!
//! The registry exclusively owns task records. Workers and the admission
//! controller hold task ids only and route every mutation through
//! [`TaskRegistry::update`], which runs the mutation under the record's
//! write lock. Reads return cloned snapshots, so callers never observe a
//! half-written record.
//!
//! ```text
//! create ──► TaskRegistry (DashMap<TaskId, Task>) ◄── update(id, mutator)
//!                    │
//!                    └──► get / list_all / list_running (snapshots)
//! ```

pub mod task_registry;

pub use task_registry::{StatusCounts, TaskRegistry};
