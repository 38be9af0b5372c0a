//! # Progress Narration
//!
//! Turns task snapshots into human-readable log lines without the workers
//! emitting anything themselves. Progress is split into five 20% buckets; each
//! bucket is narrated once per task, followed by exactly one terminal line
//! (completion, stop, or failure).
//!
//! [`NarrationEngine`] keeps a per-task [`NarrationCursor`] recording what has
//! already been emitted, so it can be fed the same snapshot any number of
//! times. The engine never touches task state.

pub mod engine;
pub mod entry;
pub mod pagination;

pub use engine::{bucket_for, narrate, NarrationCursor, NarrationEngine};
pub use entry::{LogEntry, LogLevel, Narration};
pub use pagination::{paginate, Pagination};

use serde::{Deserialize, Serialize};

/// Log query parameters; `level` is `info`, `warning`, `error` or `all`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    pub page: usize,
    /// Falls back to the configured `default_per_page`
    #[serde(default)]
    pub per_page: Option<usize>,
    #[serde(default)]
    pub level: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: None,
            level: None,
        }
    }
}

impl LogQuery {
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            page,
            per_page: Some(per_page),
            level: None,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }
}

/// One page of narration entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    pub logs: Vec<LogEntry>,
    pub pagination: Pagination,
}
