use super::entry::{LogEntry, LogLevel, Narration};
use crate::models::{StopReason, Task, TaskId};
use crate::state_machine::TaskStatus;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::json;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Progress phases, one per 20% bucket
const PHASES: [&str; 5] = [
    "Initializing",
    "Parsing site structure",
    "Locating tender section",
    "Extracting tender details",
    "Validating and finalizing",
];

const BUCKET_WIDTH: u8 = 20;

/// What has already been narrated for one task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NarrationCursor {
    /// Highest bucket emitted, 0 for none
    pub highest_bucket: u8,
    pub terminal_emitted: bool,
}

/// Bucket of a progress value: 0 for 0%, then 1 for (0,20] up to 5 for (80,100]
pub fn bucket_for(progress: u8) -> u8 {
    if progress == 0 {
        0
    } else {
        (progress.min(100) + BUCKET_WIDTH - 1) / BUCKET_WIDTH
    }
}

pub fn phase_label(bucket: u8) -> Option<&'static str> {
    bucket
        .checked_sub(1)
        .and_then(|index| PHASES.get(usize::from(index)))
        .copied()
}

/// Derive the entries `task` has not been narrated for yet.
///
/// Pure: the caller stores the returned cursor.
pub fn narrate(task: &Task, cursor: &NarrationCursor) -> (Vec<Narration>, NarrationCursor) {
    let mut next = *cursor;
    let mut narrations = Vec::new();

    if task.status == TaskStatus::Created {
        return (narrations, next);
    }

    let reached = bucket_for(task.progress);
    for bucket in (cursor.highest_bucket + 1)..=reached {
        let Some(phase) = phase_label(bucket) else {
            continue;
        };
        // Buckets caught up in one observation share the snapshot's timestamp
        narrations.push(Narration {
            timestamp: task.updated_at,
            level: LogLevel::Info,
            message: format!("{}: {}", task.task_type, phase),
            details: json!({
                "bucket": bucket,
                "phase": phase,
                "progress": task.progress,
                "hospital_ids": task.config.hospital_ids,
            }),
        });
    }
    next.highest_bucket = next.highest_bucket.max(reached);

    if task.status.is_terminal() && !cursor.terminal_emitted {
        narrations.push(terminal_narration(task));
        next.terminal_emitted = true;
    }

    (narrations, next)
}

fn terminal_narration(task: &Task) -> Narration {
    let timestamp = task.end_time.unwrap_or(task.updated_at);

    if task.status == TaskStatus::Error {
        let error = task.error_message.clone().unwrap_or_default();
        return Narration {
            timestamp,
            level: LogLevel::Error,
            message: format!("{} failed: {}", task.task_type, error),
            details: json!({
                "error": error,
                "progress": task.progress,
            }),
        };
    }

    let summary = task.result.unwrap_or_default();
    let counts = json!({
        "websites_scanned": summary.websites_scanned,
        "tenders_found": summary.tenders_found,
        "successful_scans": summary.successful_scans,
        "failed_scans": summary.failed_scans,
        "progress": task.progress,
        "stop_reason": task.stop_reason,
    });

    match task.stop_reason {
        Some(StopReason::Completed) => Narration {
            timestamp,
            level: LogLevel::Info,
            message: format!(
                "{} completed: {} websites scanned, {} tenders found",
                task.task_type, summary.websites_scanned, summary.tenders_found
            ),
            details: counts,
        },
        Some(StopReason::Cancelled) => Narration {
            timestamp,
            level: LogLevel::Warning,
            message: format!(
                "{} cancelled at {}%: {} websites scanned",
                task.task_type, task.progress, summary.websites_scanned
            ),
            details: counts,
        },
        Some(StopReason::Stopped) | None => Narration {
            timestamp,
            level: LogLevel::Warning,
            message: format!(
                "{} stopped at {}%: {} websites scanned",
                task.task_type, task.progress, summary.websites_scanned
            ),
            details: counts,
        },
    }
}

/// Most recent first; ties by ascending task id, then latest emission first
pub fn log_order(a: &LogEntry, b: &LogEntry) -> CmpOrdering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| a.task_id.cmp(&b.task_id))
        .then_with(|| b.id.cmp(&a.id))
}

/// Journal of narrated entries plus the per-task cursors that keep it free of
/// duplicates.
#[derive(Debug, Default)]
pub struct NarrationEngine {
    cursors: DashMap<TaskId, NarrationCursor>,
    journal: RwLock<Vec<LogEntry>>,
    next_id: AtomicU64,
}

impl NarrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrate anything new in `task`; returns the number of entries added.
    pub fn observe(&self, task: &Task) -> usize {
        // The cursor entry stays locked until the journal append is done, so
        // two observers of the same task cannot both emit a bucket.
        let mut cursor = self.cursors.entry(task.id).or_default();
        let (narrations, next) = narrate(task, &cursor);
        if narrations.is_empty() {
            return 0;
        }

        let added = narrations.len();
        let mut journal = self.journal.write();
        for narration in narrations {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            journal.push(LogEntry {
                id,
                timestamp: narration.timestamp,
                level: narration.level,
                message: narration.message,
                task_id: task.id,
                task_type: task.task_type,
                details: narration.details,
            });
        }
        *cursor = next;

        trace!(task_id = %task.id, added, "Narration entries appended");
        added
    }

    pub fn observe_all<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> usize {
        tasks.into_iter().map(|task| self.observe(task)).sum()
    }

    pub fn cursor(&self, task_id: TaskId) -> NarrationCursor {
        self.cursors
            .get(&task_id)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Journaled entries matching `level` (all when `None`), in log order
    pub fn entries(&self, level: Option<LogLevel>) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = self
            .journal
            .read()
            .iter()
            .filter(|entry| level.map_or(true, |wanted| entry.level == wanted))
            .cloned()
            .collect();
        entries.sort_by(log_order);
        entries
    }

    pub fn entries_for(&self, task_id: TaskId) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = self
            .journal
            .read()
            .iter()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect();
        entries.sort_by(log_order);
        entries
    }

    pub fn len(&self) -> usize {
        self.journal.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.read().is_empty()
    }
}
