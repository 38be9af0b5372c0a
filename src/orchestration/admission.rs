//! # Admission Control
//!
//! Decides whether a task may begin given the tasks that are currently
//! `running`. The decision itself is a pure function over a snapshot;
//! [`AdmissionController::enter`] hands out the guard that makes
//! check-then-act a single critical section.

use crate::models::{Task, TaskId, TaskPriority};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// What the incoming task asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRequest {
    pub priority: TaskPriority,
    pub force: bool,
}

impl AdmissionRequest {
    pub fn for_task(task: &Task) -> Self {
        Self {
            priority: task.priority,
            force: task.wants_force(),
        }
    }

    /// Request used by `resume`: the task's own priority, never forced
    pub fn for_resume(task: &Task) -> Self {
        Self {
            priority: task.priority,
            force: false,
        }
    }
}

/// Outcome of an admission check. Id lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Nothing is running
    Admit,
    /// Cancel these tasks, then admit
    ForceStop(Vec<TaskId>),
    /// Pause these lower-priority tasks, then admit
    Preempt(Vec<TaskId>),
    /// Admission refused because of these tasks
    Reject(Vec<TaskId>),
}

/// Serializes admission decisions
#[derive(Debug, Default)]
pub struct AdmissionController {
    gate: Mutex<()>,
}

impl AdmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the admission critical section. Hold the guard until the
    /// admitted task is `running` (or admission has failed).
    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Evaluate `request` against the tasks currently `running`.
    pub fn decide<'a>(
        running: impl IntoIterator<Item = &'a Task>,
        request: AdmissionRequest,
    ) -> AdmissionDecision {
        let mut others: Vec<&Task> = running.into_iter().collect();
        others.sort_by_key(|task| task.id);
        let ids: Vec<TaskId> = others.iter().map(|task| task.id).collect();

        let decision = if others.is_empty() {
            AdmissionDecision::Admit
        } else if request.force {
            AdmissionDecision::ForceStop(ids)
        } else if request.priority == TaskPriority::High
            && others.iter().all(|task| task.priority < request.priority)
        {
            AdmissionDecision::Preempt(ids)
        } else {
            AdmissionDecision::Reject(ids)
        };

        debug!(
            priority = %request.priority,
            force = request.force,
            decision = ?decision,
            "Admission evaluated"
        );
        decision
    }
}
