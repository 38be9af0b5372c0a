use crate::error::{OrchestratorError, Result};
use crate::models::{Task, TaskConfig, TaskId, TaskType};
use crate::state_machine::{TaskEvent, TaskStateMachine, TaskStatus};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Per-status task counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub created: usize,
    pub running: usize,
    pub paused: usize,
    pub stopped: usize,
    pub error: usize,
}

impl StatusCounts {
    /// Count the statuses of an existing snapshot
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            counts.record(task.status);
        }
        counts
    }

    fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Created => self.created += 1,
            TaskStatus::Running => self.running += 1,
            TaskStatus::Paused => self.paused += 1,
            TaskStatus::Stopped => self.stopped += 1,
            TaskStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.running + self.paused + self.stopped + self.error
    }
}

/// Concurrency-safe task store.
///
/// Updates to a single task are linearized by the map's per-entry write lock.
/// Mutators passed to [`TaskRegistry::update`] must not call back into the
/// registry.
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, Task>,
    /// Number of ids handed out so far; the next id is `allocated + 1`
    allocated: AtomicU64,
    capacity: usize,
}

impl TaskRegistry {
    /// Create a registry tracking at most `capacity` tasks for the process lifetime
    pub fn new(capacity: usize) -> Self {
        Self {
            tasks: DashMap::new(),
            allocated: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocate an id and store a `created` record with zero progress.
    ///
    /// Fails only with [`OrchestratorError::ResourceExhausted`], in which case
    /// nothing is stored and no id is consumed.
    pub fn create(&self, task_type: TaskType, config: TaskConfig) -> Result<TaskId> {
        let limit = self.capacity as u64;
        let previous = self
            .allocated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|_| {
                warn!(limit = self.capacity, "Task registry is full, rejecting create");
                OrchestratorError::ResourceExhausted {
                    limit: self.capacity,
                }
            })?;

        let id = TaskId::from_raw(previous + 1);
        let task = Task::new(id, task_type, config, Utc::now());
        self.tasks.insert(id, task);
        debug!(task_id = %id, task_type = %task_type, "Task registered");
        Ok(id)
    }

    pub fn get(&self, id: TaskId) -> Result<Task> {
        self.tasks
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(OrchestratorError::NotFound(id))
    }

    pub fn list_all(&self) -> HashMap<TaskId, Task> {
        self.tasks
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn list_running(&self) -> HashMap<TaskId, Task> {
        self.list_with_status(TaskStatus::Running)
    }

    fn list_with_status(&self, status: TaskStatus) -> HashMap<TaskId, Task> {
        self.tasks
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.tasks.iter() {
            counts.record(entry.value().status);
        }
        counts
    }

    /// Apply an atomic mutation to the record identified by `id`.
    pub fn update<R>(&self, id: TaskId, mutator: impl FnOnce(&mut Task) -> R) -> Result<R> {
        let mut entry = self
            .tasks
            .get_mut(&id)
            .ok_or(OrchestratorError::NotFound(id))?;
        Ok(mutator(entry.value_mut()))
    }

    /// Run a lifecycle transition and return the resulting snapshot.
    pub fn transition(&self, id: TaskId, event: TaskEvent) -> Result<Task> {
        self.transition_from(id, event).map(|(_, task)| task)
    }

    /// Like [`TaskRegistry::transition`], also returning the status the task left.
    pub fn transition_from(&self, id: TaskId, event: TaskEvent) -> Result<(TaskStatus, Task)> {
        self.update(id, |task| {
            let from = task.status;
            TaskStateMachine::transition(task, event, Utc::now()).map(|_| (from, task.clone()))
        })?
        .map_err(OrchestratorError::from)
    }

    /// Record worker progress; `Ok(false)` when the value did not change.
    pub fn record_progress(&self, id: TaskId, progress: u8) -> Result<bool> {
        self.update(id, |task| {
            TaskStateMachine::record_progress(task, progress, Utc::now())
        })?
        .map_err(OrchestratorError::from)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_TRACKED_TASKS)
    }
}
