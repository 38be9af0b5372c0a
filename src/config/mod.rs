//! # Orchestrator Configuration
//!
//! Typed settings for the crawler orchestrator. Every field has a default, so
//! an empty file (or no file at all) yields a working configuration.
//!
//! ## Sources
//!
//! Loaded by [`ConfigLoader`] in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. `CRAWLER_`-prefixed environment variables (`__` separates sections,
//!    e.g. `CRAWLER_SIMULATION__STEPS=20`)
//!
//! ```rust,no_run
//! use crawler_orchestrator::config::OrchestratorConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::from_env()?;
//! assert!(config.default_per_page <= config.max_per_page);
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use loader::ConfigLoader;

pub const DEFAULT_MAX_TRACKED_TASKS: usize = 10_000;
pub const DEFAULT_PER_PAGE: usize = 50;
pub const DEFAULT_MAX_PER_PAGE: usize = 500;
pub const DEFAULT_CONTROL_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_000;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Deployment environment (`development`, `test`, `production`)
    pub environment: String,
    pub log_format: LogFormat,
    /// Upper bound on tasks held by the registry over the process lifetime
    pub max_tracked_tasks: usize,
    pub default_per_page: usize,
    pub max_per_page: usize,
    /// How long pause/stop/resume wait for the worker to acknowledge
    pub control_timeout_ms: u64,
    pub event_channel_capacity: usize,
    pub simulation: SimulationConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
            max_tracked_tasks: DEFAULT_MAX_TRACKED_TASKS,
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: DEFAULT_MAX_PER_PAGE,
            control_timeout_ms: DEFAULT_CONTROL_TIMEOUT_MS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            simulation: SimulationConfig::default(),
        }
    }
}

/// Settings for the built-in simulated scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Sub-steps per scan
    pub steps: usize,
    pub step_interval_ms: u64,
    /// Interval used when a task asks for `fast` or `demo`
    pub fast_step_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            step_interval_ms: 500,
            fast_step_interval_ms: 20,
        }
    }
}

impl SimulationConfig {
    pub fn step_interval(&self, fast: bool) -> Duration {
        if fast {
            Duration::from_millis(self.fast_step_interval_ms)
        } else {
            Duration::from_millis(self.step_interval_ms)
        }
    }
}

impl OrchestratorConfig {
    /// Load from defaults and `CRAWLER_*` environment variables only
    pub fn from_env() -> Result<Self> {
        ConfigLoader::new().load()
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Reject settings the orchestrator cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.max_tracked_tasks == 0 {
            return Err(invalid("max_tracked_tasks must be greater than zero"));
        }
        if self.default_per_page == 0 || self.max_per_page == 0 {
            return Err(invalid("page sizes must be greater than zero"));
        }
        if self.default_per_page > self.max_per_page {
            return Err(invalid(format!(
                "default_per_page ({}) exceeds max_per_page ({})",
                self.default_per_page, self.max_per_page
            )));
        }
        if self.control_timeout_ms == 0 {
            return Err(invalid("control_timeout_ms must be greater than zero"));
        }
        if self.event_channel_capacity == 0 {
            return Err(invalid("event_channel_capacity must be greater than zero"));
        }
        if self.simulation.steps == 0 {
            return Err(invalid("simulation.steps must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::Configuration(message.into())
}
