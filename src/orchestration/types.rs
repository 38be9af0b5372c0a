//! # Orchestration Types
//!
//! Read-only views over the registry returned by the orchestrator facade.

use crate::models::{StopReason, Task, TaskId};
use crate::registry::StatusCounts;
use crate::state_machine::TaskStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Overall crawler activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerActivity {
    /// At least one task is running
    Running,
    /// Nothing is running but at least one task is paused
    Paused,
    Idle,
}

/// Aggregate crawler status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerStatus {
    pub status: CrawlerActivity,
    /// Progress of `current_task`, 0 when there is none
    pub progress: u8,
    /// Most recently started task among the running (else paused) ones
    pub current_task: Option<TaskId>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub running_tasks: usize,
    pub paused_tasks: usize,
    pub error_tasks: usize,
}

impl CrawlerStatus {
    pub fn from_tasks(tasks: &HashMap<TaskId, Task>) -> Self {
        let counts = StatusCounts::tally(tasks.values());

        let (status, focus) = if counts.running > 0 {
            (CrawlerActivity::Running, TaskStatus::Running)
        } else if counts.paused > 0 {
            (CrawlerActivity::Paused, TaskStatus::Paused)
        } else {
            (CrawlerActivity::Idle, TaskStatus::Running)
        };

        let current = tasks
            .values()
            .filter(|task| task.status == focus)
            .max_by_key(|task| (task.start_time, task.id));

        Self {
            status,
            progress: current.map_or(0, |task| task.progress),
            current_task: current.map(|task| task.id),
            total_tasks: counts.total(),
            completed_tasks: tasks
                .values()
                .filter(|task| task.stop_reason == Some(StopReason::Completed))
                .count(),
            running_tasks: counts.running,
            paused_tasks: counts.paused,
            error_tasks: counts.error,
        }
    }
}

/// Liveness report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub running_tasks_count: usize,
    pub tracked_tasks: usize,
    pub registry_capacity: usize,
    pub active_workers: usize,
}
