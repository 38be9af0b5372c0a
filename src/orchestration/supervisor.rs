//! # Worker Supervisor
//!
//! Runs each started task's [`ScanWork`] on its own tokio task and owns the
//! control channel to it.
//!
//! ## Control protocol
//!
//! ```text
//! caller ── WorkerCommand (watch) ──► worker loop ── checkpoint between sub-steps
//!        ◄── WorkerPhase  (watch) ───             └─ registry.update(...)
//! ```
//!
//! The worker itself applies `pause`, `resume` and the terminal transition to
//! the registry when it reaches a checkpoint, then publishes its new phase.
//! Callers wait (bounded by the control timeout) for that acknowledgement, so
//! when `pause` returns the task's progress is already frozen and when
//! `stop` returns the task is already terminal.
//!
//! A forced stop additionally trips a [`CancellationToken`] that interrupts
//! the in-flight sub-step. Panics inside the work are caught from the
//! [`tokio::task::JoinError`] and recorded as a task failure.

use super::work::ScanWork;
use crate::error::{OrchestratorError, Result};
use crate::events::EventPublisher;
use crate::logging::log_error;
use crate::models::{ScanSummary, Task, TaskId};
use crate::registry::TaskRegistry;
use crate::state_machine::{TaskEvent, TaskStatus, MAX_PROGRESS};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Instruction from the orchestrator to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    Run,
    Pause,
    Stop,
}

/// Worker state as acknowledged by the worker itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Running,
    Paused,
    Finished,
}

/// Strength of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Let the in-flight sub-step finish, then stop at the checkpoint
    Graceful,
    /// Interrupt the in-flight sub-step as well
    Forced,
}

#[derive(Debug, Clone)]
struct WorkerHandle {
    commands: Arc<watch::Sender<WorkerCommand>>,
    phase: watch::Receiver<WorkerPhase>,
    abort: CancellationToken,
}

#[derive(Debug)]
enum WorkOutcome {
    Completed(ScanSummary),
    Stopped(StopMode, ScanSummary),
    Failed(String),
}

enum Checkpoint {
    Continue,
    Stop(StopMode),
}

/// Owns the live workers of started tasks
#[derive(Debug)]
pub struct WorkerSupervisor {
    registry: Arc<TaskRegistry>,
    publisher: EventPublisher,
    workers: Arc<DashMap<TaskId, WorkerHandle>>,
    control_timeout: Duration,
}

impl WorkerSupervisor {
    pub fn new(
        registry: Arc<TaskRegistry>,
        publisher: EventPublisher,
        control_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            publisher,
            workers: Arc::new(DashMap::new()),
            control_timeout,
        }
    }

    /// Number of workers that have not finished yet
    pub fn active_workers(&self) -> usize {
        self.workers.len()
    }

    /// Transition the task to `running` and spawn its worker.
    ///
    /// Failures of the work never surface here; they end up on the task.
    #[instrument(skip(self, work), fields(task_id = %task_id))]
    pub fn start(&self, task_id: TaskId, work: Arc<dyn ScanWork>) -> Result<Task> {
        let (command_tx, command_rx) = watch::channel(WorkerCommand::Run);
        let (phase_tx, phase_rx) = watch::channel(WorkerPhase::Running);
        let phase = Arc::new(phase_tx);
        let abort = CancellationToken::new();

        // The handle is visible before the task reads `running`, so control
        // requests never see a running task without a worker
        match self.workers.entry(task_id) {
            Entry::Occupied(_) => {
                let from = self.registry.get(task_id)?.status;
                return Err(OrchestratorError::InvalidTransition {
                    task_id,
                    from: from.to_string(),
                    event: "start".to_string(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(WorkerHandle {
                    commands: Arc::new(command_tx),
                    phase: phase_rx,
                    abort: abort.clone(),
                });
            }
        }
        let (from, task) = match self.registry.transition_from(task_id, TaskEvent::Start) {
            Ok(applied) => applied,
            Err(err) => {
                self.workers.remove(&task_id);
                return Err(err);
            }
        };
        self.publisher.transition(from, &TaskEvent::Start, &task);

        let worker = WorkerLoop {
            task: task.clone(),
            registry: Arc::clone(&self.registry),
            publisher: self.publisher.clone(),
            work,
            commands: command_rx,
            phase: Arc::clone(&phase),
            abort,
            paused: false,
        };
        let registry = Arc::clone(&self.registry);
        let publisher = self.publisher.clone();
        let workers = Arc::clone(&self.workers);

        tokio::spawn(async move {
            let outcome = match tokio::spawn(worker.run()).await {
                Ok(outcome) => outcome,
                Err(join_error) if join_error.is_panic() => WorkOutcome::Failed(format!(
                    "worker panicked: {}",
                    panic_message(join_error.into_panic())
                )),
                Err(join_error) => WorkOutcome::Failed(format!("worker aborted: {join_error}")),
            };
            finalize(&registry, &publisher, task_id, outcome);
            workers.remove(&task_id);
            phase.send_replace(WorkerPhase::Finished);
        });

        info!(task_id = %task_id, task_type = %task.task_type, "Task started");
        Ok(task)
    }

    /// Ask the worker to suspend at its next checkpoint and wait until it has.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn pause(&self, task_id: TaskId) -> Result<Task> {
        self.require_status(task_id, "pause", |status| status == TaskStatus::Running)?;
        let handle = self.handle(task_id, "pause")?;

        handle.commands.send_replace(WorkerCommand::Pause);
        self.await_phase(task_id, handle.phase, "pause", |phase| {
            phase != WorkerPhase::Running
        })
        .await?;

        let task = self.registry.get(task_id)?;
        if task.status != TaskStatus::Paused {
            return Err(OrchestratorError::InvalidTransition {
                task_id,
                from: task.status.to_string(),
                event: "pause".to_string(),
            });
        }
        Ok(task)
    }

    /// Let a paused worker continue and wait until it is running again.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn resume(&self, task_id: TaskId) -> Result<Task> {
        self.require_status(task_id, "resume", |status| status == TaskStatus::Paused)?;
        let handle = self.handle(task_id, "resume")?;

        handle.commands.send_replace(WorkerCommand::Run);
        self.await_phase(task_id, handle.phase, "resume", |phase| {
            phase != WorkerPhase::Paused
        })
        .await?;

        self.registry.get(task_id)
    }

    /// Take back a pause request.
    ///
    /// A worker that has not reached its checkpoint yet keeps running; one
    /// that already paused is resumed and awaited. A stop request is left alone.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn withdraw_pause(&self, task_id: TaskId) -> Result<()> {
        let Some(handle) = self.workers.get(&task_id).map(|entry| entry.value().clone()) else {
            return Ok(());
        };

        let withdrawn = handle.commands.send_if_modified(|command| {
            if *command == WorkerCommand::Pause {
                *command = WorkerCommand::Run;
                true
            } else {
                false
            }
        });
        if !withdrawn {
            return Ok(());
        }

        let acknowledged = *handle.phase.borrow();
        if acknowledged == WorkerPhase::Paused {
            self.await_phase(task_id, handle.phase, "resume", |phase| {
                phase != WorkerPhase::Paused
            })
            .await?;
        }
        debug!(task_id = %task_id, "Pause request withdrawn");
        Ok(())
    }

    /// Stop a running or paused task and wait until it is terminal.
    #[instrument(skip(self), fields(task_id = %task_id, mode = ?mode))]
    pub async fn stop(&self, task_id: TaskId, mode: StopMode) -> Result<Task> {
        self.require_status(task_id, "stop", |status| status.has_worker())?;
        let handle = self.handle(task_id, "stop")?;

        if mode == StopMode::Forced {
            handle.abort.cancel();
        }
        handle.commands.send_replace(WorkerCommand::Stop);
        self.await_phase(task_id, handle.phase, "stop", |phase| {
            phase == WorkerPhase::Finished
        })
        .await?;

        self.registry.get(task_id)
    }

    /// Force-stop every live worker
    pub async fn shutdown(&self) {
        let ids: Vec<TaskId> = self.workers.iter().map(|entry| *entry.key()).collect();
        let stops = ids.iter().map(|id| self.stop(*id, StopMode::Forced));
        for (id, result) in ids.iter().zip(futures::future::join_all(stops).await) {
            if let Err(err) = result {
                warn!(task_id = %id, error = %err, "Worker did not stop cleanly during shutdown");
            }
        }
    }

    fn require_status(
        &self,
        task_id: TaskId,
        action: &str,
        allowed: impl Fn(TaskStatus) -> bool,
    ) -> Result<()> {
        let task = self.registry.get(task_id)?;
        if allowed(task.status) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                task_id,
                from: task.status.to_string(),
                event: action.to_string(),
            })
        }
    }

    fn handle(&self, task_id: TaskId, action: &str) -> Result<WorkerHandle> {
        // Clone out of the map so no shard lock is held across an await
        self.workers
            .get(&task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                let from = self
                    .registry
                    .get(task_id)
                    .map(|task| task.status.to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                OrchestratorError::InvalidTransition {
                    task_id,
                    from,
                    event: action.to_string(),
                }
            })
    }

    async fn await_phase(
        &self,
        task_id: TaskId,
        mut phase: watch::Receiver<WorkerPhase>,
        action: &'static str,
        reached: impl Fn(WorkerPhase) -> bool,
    ) -> Result<()> {
        let wait = phase.wait_for(|current| reached(*current));
        match tokio::time::timeout(self.control_timeout, wait).await {
            // A closed channel means the worker is gone, which satisfies every wait
            Ok(_) => Ok(()),
            Err(_) => {
                warn!(task_id = %task_id, action, "Worker did not acknowledge in time");
                Err(OrchestratorError::ControlTimeout {
                    task_id,
                    action,
                    timeout_ms: u64::try_from(self.control_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                })
            }
        }
    }
}

struct WorkerLoop {
    task: Task,
    registry: Arc<TaskRegistry>,
    publisher: EventPublisher,
    work: Arc<dyn ScanWork>,
    commands: watch::Receiver<WorkerCommand>,
    phase: Arc<watch::Sender<WorkerPhase>>,
    abort: CancellationToken,
    paused: bool,
}

impl WorkerLoop {
    async fn run(mut self) -> WorkOutcome {
        let task_id = self.task.id;
        let total = self.work.plan(&self.task);
        let mut summary = ScanSummary::default();
        debug!(task_id = %task_id, steps = total, "Worker loop started");

        for index in 0..total {
            if let Checkpoint::Stop(mode) = self.checkpoint().await {
                return WorkOutcome::Stopped(mode, summary);
            }

            let step = self.work.execute_step(&self.task, index);
            let report = tokio::select! {
                biased;
                _ = self.abort.cancelled() => {
                    return WorkOutcome::Stopped(StopMode::Forced, summary);
                }
                report = step => report,
            };

            match report {
                Ok(report) => summary.absorb(&report),
                Err(fault) => {
                    warn!(task_id = %task_id, step = index, error = %fault, "Scan step failed");
                    return WorkOutcome::Failed(fault.to_string());
                }
            }

            let progress = step_progress(index, total);
            if let Err(err) = self.registry.record_progress(task_id, progress) {
                warn!(task_id = %task_id, progress, error = %err, "Progress update rejected");
            }
        }

        WorkOutcome::Completed(summary)
    }

    /// Honour pending pause/stop requests. Blocks while paused.
    async fn checkpoint(&mut self) -> Checkpoint {
        loop {
            if self.abort.is_cancelled() {
                return Checkpoint::Stop(StopMode::Forced);
            }

            let command = *self.commands.borrow_and_update();
            match command {
                WorkerCommand::Stop => return Checkpoint::Stop(StopMode::Graceful),
                WorkerCommand::Run => {
                    if self.paused {
                        self.apply(TaskEvent::Resume);
                        self.paused = false;
                        self.phase.send_replace(WorkerPhase::Running);
                    }
                    return Checkpoint::Continue;
                }
                WorkerCommand::Pause => {
                    if !self.paused {
                        self.apply(TaskEvent::Pause);
                        self.paused = true;
                        self.phase.send_replace(WorkerPhase::Paused);
                    }
                    tokio::select! {
                        _ = self.abort.cancelled() => return Checkpoint::Stop(StopMode::Forced),
                        changed = self.commands.changed() => {
                            if changed.is_err() {
                                return Checkpoint::Stop(StopMode::Forced);
                            }
                        }
                    }
                }
            }
        }
    }

    fn apply(&self, event: TaskEvent) {
        match self.registry.transition_from(self.task.id, event.clone()) {
            Ok((from, task)) => {
                info!(task_id = %task.id, progress = task.progress, status = %task.status, "Worker acknowledged {}", event);
                self.publisher.transition(from, &event, &task);
            }
            Err(err) => warn!(task_id = %self.task.id, error = %err, "Worker transition rejected"),
        }
    }
}

/// Progress after finishing sub-step `index` of `total`; the last step reports 100
fn step_progress(index: usize, total: usize) -> u8 {
    let done = (index + 1).min(total);
    ((done * usize::from(MAX_PROGRESS)) / total) as u8
}

fn finalize(
    registry: &TaskRegistry,
    publisher: &EventPublisher,
    task_id: TaskId,
    outcome: WorkOutcome,
) {
    let event = match outcome {
        WorkOutcome::Completed(summary) => TaskEvent::Complete(summary),
        WorkOutcome::Stopped(StopMode::Graceful, summary) => TaskEvent::Stop(summary),
        WorkOutcome::Stopped(StopMode::Forced, summary) => TaskEvent::Cancel(summary),
        WorkOutcome::Failed(message) => TaskEvent::Fail(message),
    };

    match registry.transition_from(task_id, event.clone()) {
        Ok((from, task)) => {
            match &event {
                TaskEvent::Fail(message) => {
                    error!(task_id = %task_id, error = %message, "Task failed");
                }
                _ => info!(
                    task_id = %task_id,
                    progress = task.progress,
                    stop_reason = ?task.stop_reason,
                    "Task stopped"
                ),
            }
            publisher.transition(from, &event, &task);
        }
        Err(err) => log_error(
            "worker_supervisor",
            "finalize",
            &err.to_string(),
            Some(&task_id.to_string()),
        ),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
