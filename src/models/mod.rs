//! # Crawler Task Models
//!
//! Typed records for crawler tasks. The registry owns the canonical copy of
//! each [`Task`]; everything handed out to callers is a cloned snapshot.

pub mod scan_summary;
pub mod task;
pub mod task_config;

pub use scan_summary::{ScanSummary, StepReport};
pub use task::{StopReason, Task, TaskId, TaskPriority, TaskType};
pub use task_config::TaskConfig;
