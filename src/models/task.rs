//! # Crawler Task Model
//!
//! A [`Task`] is one schedulable crawl job. Identity, type and configuration
//! are fixed at creation; status, progress, timestamps and the outcome are
//! changed only through [`crate::state_machine::TaskStateMachine`] while the
//! registry holds the record's lock.

use super::{ScanSummary, TaskConfig};
use crate::error::OrchestratorError;
use crate::state_machine::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-local task identifier. Allocated from a monotonic counter, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{:06}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("task-").unwrap_or(s);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| format!("Invalid task id: {s}"))
    }
}

/// Kind of crawl job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Find hospital websites that are not yet tracked
    HospitalDiscovery,
    /// Re-check known tender sections for new notices
    TenderMonitor,
    /// Full scan of selected hospital websites
    HospitalScan,
}

impl TaskType {
    pub const ALL: [TaskType; 3] = [
        TaskType::HospitalDiscovery,
        TaskType::TenderMonitor,
        TaskType::HospitalScan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HospitalDiscovery => "hospital_discovery",
            Self::TenderMonitor => "tender_monitor",
            Self::HospitalScan => "hospital_scan",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|task_type| task_type.as_str() == s)
            .ok_or_else(|| OrchestratorError::InvalidTaskType(s.to_string()))
    }
}

/// Scheduling priority, read by admission control.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Normal => f.write_str("normal"),
            Self::High => f.write_str("high"),
        }
    }
}

/// Why a task ended up `stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The work reached 100%
    Completed,
    /// Graceful stop request
    Stopped,
    /// Forced cancellation, e.g. by a force-admitted task
    Cancelled,
}

/// Snapshot of a crawler task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub config: TaskConfig,
    pub status: TaskStatus,
    pub progress: u8,
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
    /// Last mutation of this record
    pub updated_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub result: Option<ScanSummary>,
    pub error_message: Option<String>,
    pub stop_reason: Option<StopReason>,
}

impl Task {
    /// Fresh record in `created` status with zero progress.
    pub fn new(id: TaskId, task_type: TaskType, config: TaskConfig, now: DateTime<Utc>) -> Self {
        let priority = config.priority;
        Self {
            id,
            task_type,
            config,
            status: TaskStatus::Created,
            progress: 0,
            priority,
            created_at: now,
            updated_at: now,
            start_time: None,
            end_time: None,
            result: None,
            error_message: None,
            stop_reason: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    pub fn wants_force(&self) -> bool {
        self.config.force
    }

    /// The recorded work failure, if the task ended in `error`
    pub fn fault(&self) -> Option<OrchestratorError> {
        (self.status == TaskStatus::Error).then(|| {
            OrchestratorError::WorkerFault(self.error_message.clone().unwrap_or_default())
        })
    }
}
