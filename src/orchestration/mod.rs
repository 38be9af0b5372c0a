//! # Orchestration Engine
//!
//! Task execution and cross-task policy for the crawler.
//!
//! ## Core Components
//!
//! - **CrawlerOrchestrator**: Facade used by the API layer; owns every other component
//! - **AdmissionController**: Decides whether a task may run next to the current ones
//!   (reject, force-stop, or pause lower-priority tasks)
//! - **WorkerSupervisor**: Runs each task's work on its own tokio task with
//!   pause/resume/stop checkpoints between sub-steps
//! - **ScanWork / WorkCatalog**: The injected unit of work behind each task type

pub mod admission;
pub mod orchestrator;
pub mod supervisor;
pub mod types;
pub mod work;

// Re-export core types and components for easy access
pub use admission::{AdmissionController, AdmissionDecision, AdmissionRequest};
pub use orchestrator::CrawlerOrchestrator;
pub use supervisor::{StopMode, WorkerCommand, WorkerPhase, WorkerSupervisor};
pub use types::{CrawlerActivity, CrawlerStatus, HealthReport};
pub use work::{ScanWork, SimulatedScan, WorkCatalog, WorkFault};
