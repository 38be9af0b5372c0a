use crate::models::ScanSummary;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events that can trigger task state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Hand the task to a worker
    Start,
    /// Suspend progress, keeping the worker context alive
    Pause,
    /// Continue a paused task from its recorded progress
    Resume,
    /// Graceful stop: the in-flight sub-step finishes first
    Stop(ScanSummary),
    /// Forced stop: the in-flight sub-step is interrupted
    Cancel(ScanSummary),
    /// The work ran to completion
    Complete(ScanSummary),
    /// The work failed with an error message
    Fail(String),
}

impl TaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop(_) => "stop",
            Self::Cancel(_) => "cancel",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stop(_) | Self::Cancel(_) | Self::Complete(_) | Self::Fail(_)
        )
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}
