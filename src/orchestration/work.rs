//! # Scan Work
//!
//! The orchestrator never fetches or parses hospital websites itself. The
//! scan is an injected capability: a [`ScanWork`] splits a task into discrete
//! sub-steps, and the worker supervisor runs them one at a time with a
//! pause/cancel checkpoint between each.
//!
//! A [`WorkCatalog`] picks the implementation for each [`TaskType`]. The
//! default catalog runs [`SimulatedScan`] for every type.

use crate::config::SimulationConfig;
use crate::models::{StepReport, Task, TaskType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by a scan sub-step
#[derive(Debug, Error)]
#[error(transparent)]
pub struct WorkFault(#[from] anyhow::Error);

impl WorkFault {
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self(anyhow::Error::msg(message))
    }
}

/// The opaque unit of work behind a crawler task
#[async_trait]
pub trait ScanWork: Send + Sync + 'static {
    /// Number of sub-steps for this task. Checkpoints fall between sub-steps.
    fn plan(&self, task: &Task) -> usize;

    /// Run sub-step `index` (`0..plan(task)`).
    ///
    /// May be dropped at an await point when the task is force-cancelled.
    async fn execute_step(&self, task: &Task, index: usize) -> Result<StepReport, WorkFault>;
}

/// Work used when nothing real is wired in: sleeps for the configured
/// interval per sub-step and reports deterministic counters.
#[derive(Debug, Clone)]
pub struct SimulatedScan {
    settings: SimulationConfig,
}

impl SimulatedScan {
    pub fn new(settings: SimulationConfig) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ScanWork for SimulatedScan {
    fn plan(&self, task: &Task) -> usize {
        if task.config.hospital_ids.is_empty() {
            self.settings.steps
        } else {
            task.config.hospital_ids.len()
        }
    }

    async fn execute_step(&self, task: &Task, index: usize) -> Result<StepReport, WorkFault> {
        tokio::time::sleep(self.settings.step_interval(task.config.wants_fast_steps())).await;

        let tenders = match task.task_type {
            TaskType::HospitalDiscovery => 0,
            TaskType::TenderMonitor | TaskType::HospitalScan => {
                (task.id.as_u64() + index as u64) % 3
            }
        };
        Ok(StepReport::scanned(tenders))
    }
}

/// Maps task types to the work that executes them
#[derive(Clone)]
pub struct WorkCatalog {
    by_type: HashMap<TaskType, Arc<dyn ScanWork>>,
    fallback: Arc<dyn ScanWork>,
}

impl WorkCatalog {
    /// Catalog that runs `fallback` for every task type
    pub fn new(fallback: Arc<dyn ScanWork>) -> Self {
        Self {
            by_type: HashMap::new(),
            fallback,
        }
    }

    pub fn simulated(settings: SimulationConfig) -> Self {
        Self::new(Arc::new(SimulatedScan::new(settings)))
    }

    pub fn with_work(mut self, task_type: TaskType, work: Arc<dyn ScanWork>) -> Self {
        self.by_type.insert(task_type, work);
        self
    }

    pub fn work_for(&self, task_type: TaskType) -> Arc<dyn ScanWork> {
        self.by_type
            .get(&task_type)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl fmt::Debug for WorkCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkCatalog")
            .field("registered_types", &self.by_type.keys().collect::<Vec<_>>())
            .finish()
    }
}
