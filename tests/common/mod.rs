//! Shared fixtures for the integration tests: deterministic scan work whose
//! sub-steps are released by the test, plus work that fails or panics.

#![allow(dead_code)]

use async_trait::async_trait;
use crawler_orchestrator::{
    CrawlerOrchestrator, OrchestratorConfig, ScanWork, SimulationConfig, StepReport, Task,
    TaskId, WorkCatalog, WorkFault,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Work whose sub-steps each need a permit from the test.
///
/// A worker blocked on a permit is inside `execute_step`, so a pause or
/// graceful stop takes effect only after the next [`GatedScan::release`].
#[derive(Debug, Clone)]
pub struct GatedScan {
    steps: usize,
    gate: Arc<Semaphore>,
    executed: Arc<AtomicUsize>,
}

impl GatedScan {
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            gate: Arc::new(Semaphore::new(0)),
            executed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let `count` more sub-steps finish
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub fn release_all(&self) {
        self.gate.add_permits(self.steps);
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanWork for GatedScan {
    fn plan(&self, _task: &Task) -> usize {
        self.steps
    }

    async fn execute_step(&self, _task: &Task, _index: usize) -> Result<StepReport, WorkFault> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|err| WorkFault::msg(err.to_string()))?;
        permit.forget();
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(StepReport::scanned(1))
    }
}

/// Work that fails at step `fail_at`
#[derive(Debug, Clone)]
pub struct FailingScan {
    pub steps: usize,
    pub fail_at: usize,
}

#[async_trait]
impl ScanWork for FailingScan {
    fn plan(&self, _task: &Task) -> usize {
        self.steps
    }

    async fn execute_step(&self, _task: &Task, index: usize) -> Result<StepReport, WorkFault> {
        if index == self.fail_at {
            return Err(WorkFault::msg("connection timeout after 30 seconds"));
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(StepReport::scanned(0))
    }
}

/// Work that panics at step `panic_at`
#[derive(Debug, Clone)]
pub struct PanickingScan {
    pub panic_at: usize,
}

#[async_trait]
impl ScanWork for PanickingScan {
    fn plan(&self, _task: &Task) -> usize {
        4
    }

    async fn execute_step(&self, _task: &Task, index: usize) -> Result<StepReport, WorkFault> {
        if index == self.panic_at {
            panic!("parser exploded");
        }
        Ok(StepReport::scanned(0))
    }
}

/// Configuration with millisecond-scale simulation and a short control timeout
pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        environment: "test".to_string(),
        control_timeout_ms: 2_000,
        simulation: SimulationConfig {
            steps: 4,
            step_interval_ms: 2,
            fast_step_interval_ms: 1,
        },
        ..OrchestratorConfig::default()
    }
}

pub fn orchestrator_with(work: Arc<dyn ScanWork>) -> CrawlerOrchestrator {
    orchestrator_with_catalog(WorkCatalog::new(work))
}

pub fn orchestrator_with_catalog(catalog: WorkCatalog) -> CrawlerOrchestrator {
    CrawlerOrchestrator::with_catalog(test_config(), catalog).expect("valid test config")
}

/// Poll `condition` until it holds, panicking after [`WAIT_LIMIT`]
pub async fn eventually(description: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {description}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Wait until the task reaches at least `progress`
pub async fn wait_for_progress(orchestrator: &CrawlerOrchestrator, id: TaskId, progress: u8) {
    eventually(&format!("{id} to reach {progress}%"), || {
        orchestrator
            .get_task(id)
            .map(|task| task.progress >= progress)
            .unwrap_or(false)
    })
    .await;
}

/// Wait until the task is terminal and return it
pub async fn wait_for_terminal(orchestrator: &CrawlerOrchestrator, id: TaskId) -> Task {
    eventually(&format!("{id} to finish"), || {
        orchestrator
            .get_task(id)
            .map(|task| task.is_terminal())
            .unwrap_or(false)
    })
    .await;
    orchestrator.get_task(id).expect("task exists")
}
