#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Crawler Orchestrator
//!
//! In-process orchestration for hospital-website crawl tasks: a task
//! registry, a lifecycle state machine, admission control with force-stop and
//! priority preemption, a worker supervisor with pause/resume/cancel, and a
//! narration engine that turns task progress into paginated log entries.
//!
//! ## Architecture
//!
//! ```text
//! API layer ──► CrawlerOrchestrator ──► AdmissionController (critical section)
//!                     │                        │
//!                     ▼                        ▼
//!               TaskRegistry ◄────────── WorkerSupervisor ──► ScanWork (injected)
//!                     │
//!                     ▼
//!             NarrationEngine ──► LogPage
//! ```
//!
//! The registry is the only owner of task records. Workers address tasks by
//! id and route every change through the registry's per-task update, where
//! the [`state_machine`] validates it.
//!
//! ## Module Organization
//!
//! - [`models`] - Task records, ids, types, configuration and result counters
//! - [`state_machine`] - Lifecycle states, events and transition rules
//! - [`registry`] - Concurrency-safe task store
//! - [`orchestration`] - Admission, worker supervision and the facade
//! - [`narration`] - Progress narration and log pagination
//! - [`events`] - Broadcast of applied lifecycle transitions
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crawler_orchestrator::{CrawlerOrchestrator, LogQuery, OrchestratorConfig, TaskConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::from_env()?;
//! crawler_orchestrator::logging::init_from_config(&config);
//!
//! let orchestrator = CrawlerOrchestrator::new(config)?;
//! let task = orchestrator
//!     .trigger("tender_monitor", TaskConfig::new().with_fast(true))
//!     .await?;
//! println!("started {} ({})", task.id, task.status);
//!
//! let page = orchestrator.derive_logs(LogQuery::page(1, 20).with_level("all"))?;
//! println!("{} log entries", page.pagination.total_items);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod narration;
pub mod orchestration;
pub mod registry;
pub mod state_machine;

pub use config::{ConfigLoader, LogFormat, OrchestratorConfig, SimulationConfig};
// Re-export constants events with different name to avoid conflict
pub use constants::events as lifecycle_events;
pub use error::{OrchestratorError, Result};
pub use events::{EventPublisher, LifecycleEvent};
pub use models::{
    ScanSummary, StepReport, StopReason, Task, TaskConfig, TaskId, TaskPriority, TaskType,
};
pub use narration::{LogEntry, LogLevel, LogPage, LogQuery, Pagination};
pub use orchestration::{
    CrawlerActivity, CrawlerOrchestrator, CrawlerStatus, HealthReport, ScanWork, SimulatedScan,
    StopMode, WorkCatalog, WorkFault,
};
pub use registry::{StatusCounts, TaskRegistry};
pub use state_machine::{TaskEvent, TaskStateMachine, TaskStatus};
