use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TaskEvent,
    states::TaskStatus,
};
use crate::models::{StopReason, Task, TaskId};
use chrono::{DateTime, Utc};

/// Upper bound of the progress scale
pub const MAX_PROGRESS: u8 = 100;

/// Lifecycle rules for crawler tasks.
///
/// Stateless: every call receives the record to check and mutate. Callers
/// must hold exclusive access to the record for the duration of the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        task_id: TaskId,
        current: TaskStatus,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskStatus> {
        let target = match (current, event) {
            (TaskStatus::Created, TaskEvent::Start) => TaskStatus::Running,

            (TaskStatus::Running, TaskEvent::Pause) => TaskStatus::Paused,
            (TaskStatus::Paused, TaskEvent::Resume) => TaskStatus::Running,

            (TaskStatus::Running | TaskStatus::Paused, TaskEvent::Stop(_)) => TaskStatus::Stopped,
            (TaskStatus::Running | TaskStatus::Paused, TaskEvent::Cancel(_)) => {
                TaskStatus::Stopped
            }
            (TaskStatus::Running, TaskEvent::Complete(_)) => TaskStatus::Stopped,

            (TaskStatus::Running | TaskStatus::Paused, TaskEvent::Fail(_)) => TaskStatus::Error,

            (from, event) => return Err(StateMachineError::invalid(task_id, from, event)),
        };

        Ok(target)
    }

    /// Validate `event` against the task's status and apply its effects.
    ///
    /// On error the task is left untouched.
    pub fn transition(
        task: &mut Task,
        event: TaskEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<TaskStatus> {
        let target = Self::determine_target_state(task.id, task.status, &event)?;

        match event {
            TaskEvent::Start => {
                task.start_time = Some(now);
            }
            TaskEvent::Pause | TaskEvent::Resume => {}
            TaskEvent::Stop(summary) => {
                Self::finish_stopped(task, summary, StopReason::Stopped, now);
            }
            TaskEvent::Cancel(summary) => {
                Self::finish_stopped(task, summary, StopReason::Cancelled, now);
            }
            TaskEvent::Complete(summary) => {
                task.progress = MAX_PROGRESS;
                Self::finish_stopped(task, summary.finished(), StopReason::Completed, now);
            }
            TaskEvent::Fail(message) => {
                task.end_time = Some(now);
                task.error_message = Some(message);
            }
        }

        task.status = target;
        task.updated_at = now;
        Ok(target)
    }

    /// Record a new progress value for a running task.
    ///
    /// Returns `Ok(false)` when the value equals the recorded one.
    pub fn record_progress(
        task: &mut Task,
        progress: u8,
        now: DateTime<Utc>,
    ) -> StateMachineResult<bool> {
        if task.status != TaskStatus::Running {
            return Err(StateMachineError::NotRunning {
                task_id: task.id,
                status: task.status,
            });
        }
        if progress > MAX_PROGRESS {
            return Err(StateMachineError::ProgressOutOfRange {
                task_id: task.id,
                value: progress,
            });
        }
        if progress < task.progress {
            return Err(StateMachineError::ProgressRegression {
                task_id: task.id,
                current: task.progress,
                attempted: progress,
            });
        }
        if progress == task.progress {
            return Ok(false);
        }

        task.progress = progress;
        task.updated_at = now;
        Ok(true)
    }

    fn finish_stopped(
        task: &mut Task,
        summary: crate::models::ScanSummary,
        reason: StopReason,
        now: DateTime<Utc>,
    ) {
        task.end_time = Some(now);
        task.result = Some(summary);
        task.stop_reason = Some(reason);
    }
}
