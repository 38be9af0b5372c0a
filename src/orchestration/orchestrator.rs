//! # Crawler Orchestrator
//!
//! The facade the API layer talks to. Bundles the registry, admission
//! control, the worker supervisor, narration and lifecycle events.
//!
//! Every operation that can make a task `running` (start, resume, trigger)
//! runs inside the admission critical section, so two callers can never both
//! conclude they have the crawler to themselves.
//!
//! ```rust,no_run
//! use crawler_orchestrator::{CrawlerOrchestrator, OrchestratorConfig, TaskConfig};
//!
//! # async fn example() -> crawler_orchestrator::Result<()> {
//! let orchestrator = CrawlerOrchestrator::new(OrchestratorConfig::default())?;
//! let id = orchestrator.create_task("hospital_scan", TaskConfig::new().with_hospitals([1, 2]))?;
//! orchestrator.start_task(id).await?;
//! # Ok(())
//! # }
//! ```

use super::admission::{AdmissionController, AdmissionDecision, AdmissionRequest};
use super::supervisor::{StopMode, WorkerSupervisor};
use super::types::{CrawlerStatus, HealthReport};
use super::work::WorkCatalog;
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::events::{EventPublisher, LifecycleEvent};
use crate::logging::log_task_operation;
use crate::models::{Task, TaskConfig, TaskId, TaskType};
use crate::narration::{paginate, LogEntry, LogLevel, LogPage, LogQuery, NarrationEngine};
use crate::registry::TaskRegistry;
use crate::state_machine::TaskStatus;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

#[derive(Debug)]
pub struct CrawlerOrchestrator {
    config: OrchestratorConfig,
    registry: Arc<TaskRegistry>,
    admission: AdmissionController,
    supervisor: WorkerSupervisor,
    narration: NarrationEngine,
    publisher: EventPublisher,
    catalog: WorkCatalog,
}

impl CrawlerOrchestrator {
    /// Orchestrator running the simulated scan for every task type
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let catalog = WorkCatalog::simulated(config.simulation.clone());
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: OrchestratorConfig, catalog: WorkCatalog) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(TaskRegistry::new(config.max_tracked_tasks));
        let publisher = EventPublisher::new(config.event_channel_capacity);
        let supervisor = WorkerSupervisor::new(
            Arc::clone(&registry),
            publisher.clone(),
            config.control_timeout(),
        );

        info!(
            environment = %config.environment,
            max_tracked_tasks = config.max_tracked_tasks,
            "Crawler orchestrator initialized"
        );

        Ok(Self {
            config,
            registry,
            admission: AdmissionController::new(),
            supervisor,
            narration: NarrationEngine::new(),
            publisher,
            catalog,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Register a task in `created` status. Unknown types create nothing.
    #[instrument(skip(self, config))]
    pub fn create_task(&self, task_type: &str, config: TaskConfig) -> Result<TaskId> {
        let task_type: TaskType = task_type.parse()?;
        self.create_typed(task_type, config)
    }

    fn create_typed(&self, task_type: TaskType, config: TaskConfig) -> Result<TaskId> {
        let id = self.registry.create(task_type, config)?;
        let task = self.registry.get(id)?;
        self.publisher.task_created(&task);

        log_task_operation(
            "create",
            Some(&id.to_string()),
            Some(task_type.as_str()),
            task.status.as_str(),
            None,
        );
        Ok(id)
    }

    /// Admit and start a `created` task.
    ///
    /// Fails with `InvalidTransition` unless the task is `created`, and with
    /// `AdmissionConflict` when another task is running and the request can
    /// neither force nor preempt it.
    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn start_task(&self, id: TaskId) -> Result<Task> {
        let _admission = self.admission.enter().await;
        self.start_locked(id).await
    }

    /// Create a task and start it in one admission step.
    ///
    /// Admission runs before anything is registered, so a conflict or a
    /// failed preemption leaves no `created` task behind.
    #[instrument(skip(self, config))]
    pub async fn trigger(&self, task_type: &str, config: TaskConfig) -> Result<Task> {
        let task_type: TaskType = task_type.parse()?;
        let _admission = self.admission.enter().await;

        let request = AdmissionRequest {
            priority: config.priority,
            force: config.force,
        };
        let preempted = self.admit(task_type.as_str(), request).await?;

        let id = match self.create_typed(task_type, config) {
            Ok(id) => id,
            Err(err) => {
                self.restore(&preempted).await;
                return Err(err);
            }
        };
        self.launch(self.registry.get(id)?)
    }

    /// Gracefully stop a running or paused task; returns its terminal snapshot.
    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn stop_task(&self, id: TaskId) -> Result<Task> {
        let task = self.supervisor.stop(id, StopMode::Graceful).await?;
        self.log_operation("stop", &task);
        Ok(task)
    }

    /// Stop a running or paused task, interrupting its in-flight sub-step.
    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn cancel_task(&self, id: TaskId) -> Result<Task> {
        let task = self.supervisor.stop(id, StopMode::Forced).await?;
        self.log_operation("cancel", &task);
        Ok(task)
    }

    /// Suspend a running task, keeping its progress for a later resume.
    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn pause_task(&self, id: TaskId) -> Result<Task> {
        let task = self.supervisor.pause(id).await?;
        self.log_operation("pause", &task);
        Ok(task)
    }

    /// Continue a paused task, subject to admission without force.
    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn resume_task(&self, id: TaskId) -> Result<Task> {
        let _admission = self.admission.enter().await;

        let task = self.registry.get(id)?;
        if task.status != TaskStatus::Paused {
            return Err(invalid_transition(&task, "resume"));
        }
        self.admit(&task.id.to_string(), AdmissionRequest::for_resume(&task))
            .await?;

        let task = self.supervisor.resume(id).await?;
        self.log_operation("resume", &task);
        Ok(task)
    }

    pub fn get_task(&self, id: TaskId) -> Result<Task> {
        self.registry.get(id)
    }

    pub fn list_all(&self) -> HashMap<TaskId, Task> {
        self.registry.list_all()
    }

    pub fn list_running(&self) -> HashMap<TaskId, Task> {
        self.registry.list_running()
    }

    /// Narrate the current registry state and return one page of the log.
    pub fn derive_logs(&self, query: LogQuery) -> Result<LogPage> {
        let level = match query.level.as_deref() {
            Some(raw) => LogLevel::parse_filter(raw)?,
            None => None,
        };
        let per_page = query
            .per_page
            .unwrap_or(self.config.default_per_page)
            .min(self.config.max_per_page);

        let snapshot = self.registry.list_all();
        self.narration.observe_all(snapshot.values());

        let (logs, pagination) = paginate(self.narration.entries(level), query.page, per_page)?;
        Ok(LogPage { logs, pagination })
    }

    /// Every narration entry for one task, most recent first
    pub fn task_logs(&self, id: TaskId) -> Result<Vec<LogEntry>> {
        let task = self.registry.get(id)?;
        self.narration.observe(&task);
        Ok(self.narration.entries_for(id))
    }

    pub fn status_summary(&self) -> CrawlerStatus {
        CrawlerStatus::from_tasks(&self.registry.list_all())
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            running_tasks_count: self.registry.status_counts().running,
            tracked_tasks: self.registry.len(),
            registry_capacity: self.registry.capacity(),
            active_workers: self.supervisor.active_workers(),
        }
    }

    /// Lifecycle events for every task from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.publisher.subscribe()
    }

    /// Cancel every live worker and wait for them to finish
    pub async fn shutdown(&self) {
        let _admission = self.admission.enter().await;
        info!(active_workers = self.supervisor.active_workers(), "Shutting down crawler workers");
        self.supervisor.shutdown().await;
    }

    async fn start_locked(&self, id: TaskId) -> Result<Task> {
        let task = self.registry.get(id)?;
        if task.status != TaskStatus::Created {
            return Err(invalid_transition(&task, "start"));
        }

        self.admit(&task.id.to_string(), AdmissionRequest::for_task(&task))
            .await?;
        self.launch(task)
    }

    /// Spawn the worker of an admitted `created` task
    fn launch(&self, task: Task) -> Result<Task> {
        let id = task.id;
        let work = self.catalog.work_for(task.task_type);
        let task = self.supervisor.start(id, work)?;
        self.log_operation("start", &task);
        Ok(task)
    }

    /// Make room for `candidate` according to the admission decision.
    ///
    /// Returns the tasks paused by preemption. When a pause fails, every
    /// victim is put back to running before the error is returned.
    async fn admit(&self, candidate: &str, request: AdmissionRequest) -> Result<Vec<TaskId>> {
        let running = self.registry.list_running();
        match AdmissionController::decide(running.values(), request) {
            AdmissionDecision::Admit => Ok(Vec::new()),
            AdmissionDecision::Reject(blocking) => {
                warn!(candidate, blocking = ?blocking, "Admission rejected");
                Err(OrchestratorError::AdmissionConflict { running: blocking })
            }
            AdmissionDecision::ForceStop(victims) => {
                info!(candidate, victims = ?victims, "Force admission, cancelling running tasks");
                let stops = victims
                    .iter()
                    .map(|victim| self.supervisor.stop(*victim, StopMode::Forced));
                self.settle(&victims, join_all(stops).await, |status| {
                    status.is_terminal()
                })?;
                Ok(Vec::new())
            }
            AdmissionDecision::Preempt(victims) => {
                info!(candidate, victims = ?victims, "Priority preemption, pausing running tasks");
                let pauses = victims.iter().map(|victim| self.supervisor.pause(*victim));
                let settled = self.settle(&victims, join_all(pauses).await, |status| {
                    status != TaskStatus::Running
                });
                if let Err(err) = settled {
                    self.restore(&victims).await;
                    return Err(err);
                }
                Ok(victims)
            }
        }
    }

    /// Undo a preemption: withdraw pending pauses and resume applied ones
    async fn restore(&self, victims: &[TaskId]) {
        if victims.is_empty() {
            return;
        }
        warn!(victims = ?victims, "Preemption abandoned, restoring paused tasks");
        let withdrawals = victims
            .iter()
            .map(|victim| self.supervisor.withdraw_pause(*victim));
        for (victim, result) in victims.iter().zip(join_all(withdrawals).await) {
            if let Err(err) = result {
                warn!(task_id = %victim, error = %err, "Preempted task could not be restored");
            }
        }
    }

    /// Accept a failed stop/pause when the victim left `running` on its own.
    fn settle(
        &self,
        victims: &[TaskId],
        results: Vec<Result<Task>>,
        cleared: impl Fn(TaskStatus) -> bool,
    ) -> Result<()> {
        for (victim, result) in victims.iter().zip(results) {
            if let Err(err) = result {
                let status = self.registry.get(*victim)?.status;
                if !cleared(status) {
                    return Err(err);
                }
                warn!(task_id = %victim, status = %status, error = %err, "Victim finished before it could be displaced");
            }
        }
        Ok(())
    }

    fn log_operation(&self, operation: &str, task: &Task) {
        log_task_operation(
            operation,
            Some(&task.id.to_string()),
            Some(task.task_type.as_str()),
            task.status.as_str(),
            Some(&format!("progress={}", task.progress)),
        );
    }
}

fn invalid_transition(task: &Task, event: &str) -> OrchestratorError {
    OrchestratorError::InvalidTransition {
        task_id: task.id,
        from: task.status.to_string(),
        event: event.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            control_timeout_ms: 5_000,
            simulation: SimulationConfig {
                steps: 5,
                step_interval_ms: 5,
                fast_step_interval_ms: 1,
            },
            ..OrchestratorConfig::default()
        }
    }

    #[test]
    fn test_bogus_type_creates_nothing() {
        let orchestrator = CrawlerOrchestrator::new(fast_config()).unwrap();
        let err = orchestrator.create_task("bogus", TaskConfig::default()).unwrap_err();
        assert_eq!(err, OrchestratorError::InvalidTaskType("bogus".to_string()));
        assert!(orchestrator.list_all().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = OrchestratorConfig {
            max_tracked_tasks: 0,
            ..OrchestratorConfig::default()
        };
        assert!(CrawlerOrchestrator::new(config).is_err());
    }

    #[tokio::test]
    async fn test_start_twice_is_invalid_transition() {
        let orchestrator = CrawlerOrchestrator::new(fast_config()).unwrap();
        let id = orchestrator
            .create_task("tender_monitor", TaskConfig::default())
            .unwrap();
        orchestrator.start_task(id).await.unwrap();

        let err = orchestrator.start_task(id).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidTransition { .. }));
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_health_reports_running_count() {
        let orchestrator = CrawlerOrchestrator::new(fast_config()).unwrap();
        let health = orchestrator.health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.running_tasks_count, 0);
        assert_eq!(health.registry_capacity, 10_000);
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let orchestrator = CrawlerOrchestrator::new(fast_config()).unwrap();
        let err = orchestrator
            .derive_logs(LogQuery::default().with_level("verbose"))
            .unwrap_err();
        assert_eq!(err, OrchestratorError::InvalidLogLevel("verbose".to_string()));
    }
}
