use crate::constants::log_levels;
use crate::error::{OrchestratorError, Result};
use crate::models::{TaskId, TaskType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Severity of a narrated log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => log_levels::INFO,
            Self::Warning => log_levels::WARNING,
            Self::Error => log_levels::ERROR,
        }
    }

    /// Parse a query filter. `all` (any case) means no filter.
    pub fn parse_filter(raw: &str) -> Result<Option<Self>> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            log_levels::ALL => Ok(None),
            log_levels::INFO => Ok(Some(Self::Info)),
            log_levels::WARNING => Ok(Some(Self::Warning)),
            log_levels::ERROR => Ok(Some(Self::Error)),
            _ => Err(OrchestratorError::InvalidLogLevel(raw.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A narration line before it is journaled
#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub details: Value,
}

/// A journaled narration line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequence number in emission order, starting at 1
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub details: Value,
}
