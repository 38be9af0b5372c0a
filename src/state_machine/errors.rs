use super::{TaskEvent, TaskStatus};
use crate::models::TaskId;
use thiserror::Error;

/// Error types for state machine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid state transition for {task_id}: {event} from {from}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        event: &'static str,
    },

    #[error("Progress regression for {task_id}: {attempted} < {current}")]
    ProgressRegression {
        task_id: TaskId,
        current: u8,
        attempted: u8,
    },

    #[error("Progress out of range for {task_id}: {value}")]
    ProgressOutOfRange { task_id: TaskId, value: u8 },

    #[error("Progress reported for {task_id} while {status}")]
    NotRunning { task_id: TaskId, status: TaskStatus },
}

impl StateMachineError {
    pub(crate) fn invalid(task_id: TaskId, from: TaskStatus, event: &TaskEvent) -> Self {
        Self::InvalidTransition {
            task_id,
            from,
            event: event.event_type(),
        }
    }
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
