use super::TaskPriority;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied configuration for a crawler task.
///
/// The well-known keys are typed; anything else the caller sends is kept
/// verbatim in `extra` and handed to the scan work untouched. Immutable once
/// the task is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Hospitals to scan; empty means the work decides its own targets.
    pub hospital_ids: Vec<u64>,
    /// Stop every running task before this one starts.
    #[serde(alias = "force_update")]
    pub force: bool,
    /// Use the short step interval.
    pub fast: bool,
    /// Demo run: short interval and synthetic counters only.
    pub demo: bool,
    pub priority: TaskPriority,
    pub scan_scope: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hospitals(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.hospital_ids = ids.into_iter().collect();
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_fast(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    pub fn with_demo(mut self, demo: bool) -> Self {
        self.demo = demo;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_scan_scope(mut self, scope: impl Into<String>) -> Self {
        self.scan_scope = Some(scope.into());
        self
    }

    /// Whether the short step interval applies.
    pub fn wants_fast_steps(&self) -> bool {
        self.fast || self.demo
    }

    /// Parse a JSON object as sent by the HTTP layer.
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
