//! Error types for the crawler orchestrator.
//!

use crate::models::TaskId;
use crate::state_machine::StateMachineError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("Unsupported task type '{0}', expected one of: hospital_discovery, tender_monitor, hospital_scan")]
    InvalidTaskType(String),
    #[error("Task not found: {0}")]
    NotFound(TaskId),
    #[error("Invalid transition for task {task_id}: cannot apply '{event}' in state {from}")]
    InvalidTransition {
        task_id: TaskId,
        from: String,
        event: String,
    },
    #[error("Admission conflict: task(s) {} already active", format_ids(.running))]
    AdmissionConflict { running: Vec<TaskId> },
    #[error("Worker fault: {0}")]
    WorkerFault(String),
    #[error("Resource exhausted: registry is full ({limit} tasks tracked)")]
    ResourceExhausted { limit: usize },
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
    #[error("Invalid log level filter: {0}")]
    InvalidLogLevel(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Timed out after {timeout_ms}ms waiting for task {task_id} to acknowledge {action}")]
    ControlTimeout {
        task_id: TaskId,
        action: &'static str,
        timeout_ms: u64,
    },
}

impl OrchestratorError {
    /// Recoverable errors leave the orchestrator untouched; callers may retry or adjust.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidTransition { .. } | Self::AdmissionConflict { .. }
        )
    }
}

fn format_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<StateMachineError> for OrchestratorError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::InvalidTransition {
                task_id,
                from,
                event,
            } => Self::InvalidTransition {
                task_id,
                from: from.to_string(),
                event: event.to_string(),
            },
            StateMachineError::ProgressRegression {
                task_id, current, ..
            } => Self::InvalidTransition {
                task_id,
                from: format!("progress {current}"),
                event: "report_progress".to_string(),
            },
            StateMachineError::ProgressOutOfRange { task_id, value } => Self::InvalidTransition {
                task_id,
                from: format!("progress {value}"),
                event: "report_progress".to_string(),
            },
            StateMachineError::NotRunning { task_id, status } => Self::InvalidTransition {
                task_id,
                from: status.to_string(),
                event: "report_progress".to_string(),
            },
        }
    }
}

impl From<::config::ConfigError> for OrchestratorError {
    fn from(err: ::config::ConfigError) -> Self {
        OrchestratorError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
