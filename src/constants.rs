//! # System Constants
//!
//! Event names and log level names shared by the orchestrator components.

/// Lifecycle event names published on the event channel
pub mod events {
    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_STARTED: &str = "task.started";
    pub const TASK_PAUSED: &str = "task.paused";
    pub const TASK_RESUMED: &str = "task.resumed";
    pub const TASK_STOPPED: &str = "task.stopped";
    pub const TASK_CANCELLED: &str = "task.cancelled";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_FAILED: &str = "task.failed";
}

/// Narration log levels accepted by the log query
pub mod log_levels {
    pub const INFO: &str = "info";
    pub const WARNING: &str = "warning";
    pub const ERROR: &str = "error";
    /// Filter value meaning "no level filter"
    pub const ALL: &str = "all";
}
