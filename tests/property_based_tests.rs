//! Property tests for the lifecycle rules, narration de-duplication and
//! pagination arithmetic.

use chrono::{Duration, Utc};
use crawler_orchestrator::narration::{bucket_for, narrate, paginate, LogLevel, NarrationCursor};
use crawler_orchestrator::{
    ScanSummary, Task, TaskConfig, TaskEvent, TaskId, TaskStateMachine, TaskStatus, TaskType,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn event_strategy() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        Just(TaskEvent::Start),
        Just(TaskEvent::Pause),
        Just(TaskEvent::Resume),
        Just(TaskEvent::Stop(ScanSummary::default())),
        Just(TaskEvent::Cancel(ScanSummary::default())),
        Just(TaskEvent::Complete(ScanSummary::default())),
        "[a-z ]{1,20}".prop_map(TaskEvent::Fail),
    ]
}

/// Either a lifecycle event or a progress report
#[derive(Debug, Clone)]
enum Step {
    Event(TaskEvent),
    Progress(u8),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        event_strategy().prop_map(Step::Event),
        (0u8..=120).prop_map(Step::Progress),
    ]
}

fn fresh_task() -> Task {
    Task::new(
        TaskId::from_raw(1),
        TaskType::HospitalScan,
        TaskConfig::default(),
        Utc::now(),
    )
}

proptest! {
    /// Property: progress never decreases while running, and terminal tasks
    /// carry `end_time` plus exactly one of `result` / `error_message`
    #[test]
    fn lifecycle_invariants_hold_for_any_sequence(steps in prop::collection::vec(step_strategy(), 0..40)) {
        let mut task = fresh_task();
        let mut now = Utc::now();

        for step in steps {
            now += Duration::milliseconds(1);
            let before = task.clone();
            let outcome = match step {
                Step::Event(event) => TaskStateMachine::transition(&mut task, event, now).map(|_| ()),
                Step::Progress(value) => TaskStateMachine::record_progress(&mut task, value, now).map(|_| ()),
            };

            if outcome.is_err() {
                prop_assert_eq!(&task, &before, "failed operations must not mutate the task");
            }
            if before.status == TaskStatus::Running && task.status == TaskStatus::Running {
                prop_assert!(task.progress >= before.progress);
            }
            if before.is_terminal() {
                prop_assert_eq!(&task, &before, "terminal tasks accept no transitions");
            }
            if task.is_terminal() {
                prop_assert!(task.end_time.is_some());
                prop_assert!(task.result.is_some() != task.error_message.is_some());
            }
        }
    }

    /// Property: a task narrated at arbitrary points emits each bucket at most
    /// once and its terminal entry exactly once
    #[test]
    fn narration_never_duplicates(
        mut checkpoints in prop::collection::vec(0u8..=100, 1..30),
        failed in any::<bool>(),
    ) {
        checkpoints.sort_unstable();
        let mut task = fresh_task();
        task.status = TaskStatus::Running;
        let mut cursor = NarrationCursor::default();
        let mut emitted = Vec::new();

        for progress in &checkpoints {
            task.progress = *progress;
            let (narrations, next) = narrate(&task, &cursor);
            emitted.extend(narrations);
            cursor = next;
        }

        if failed {
            TaskStateMachine::transition(&mut task, TaskEvent::Fail("boom".into()), Utc::now()).unwrap();
        } else {
            TaskStateMachine::transition(&mut task, TaskEvent::Complete(ScanSummary::default()), Utc::now()).unwrap();
        }
        for _ in 0..3 {
            let (narrations, next) = narrate(&task, &cursor);
            emitted.extend(narrations);
            cursor = next;
        }

        let buckets: Vec<u64> = emitted
            .iter()
            .filter_map(|entry| entry.details.get("bucket").and_then(|b| b.as_u64()))
            .collect();
        let unique: HashSet<u64> = buckets.iter().copied().collect();
        prop_assert_eq!(buckets.len(), unique.len());
        prop_assert_eq!(unique.len() as u8, bucket_for(task.progress));

        let terminal = emitted.len() - buckets.len();
        prop_assert_eq!(terminal, 1);
        let last = emitted.last().unwrap();
        prop_assert_eq!(last.level, if failed { LogLevel::Error } else { LogLevel::Info });
    }

    /// Property: pagination follows `(page-1)*per_page` slicing with
    /// `total_pages = ceil(total/per_page)`
    #[test]
    fn pagination_arithmetic(total in 0usize..200, page in 1usize..30, per_page in 1usize..40) {
        let items: Vec<usize> = (0..total).collect();
        let (slice, meta) = paginate(items, page, per_page).unwrap();

        let start = (page - 1) * per_page;
        let expected_len = total.saturating_sub(start).min(per_page);
        prop_assert_eq!(slice.len(), expected_len);
        if let Some(first) = slice.first() {
            prop_assert_eq!(*first, start);
        }
        prop_assert_eq!(meta.total_items, total);
        prop_assert_eq!(meta.total_pages, (total + per_page - 1) / per_page);
        prop_assert_eq!(meta.has_next, start + per_page < total);
        prop_assert_eq!(meta.has_prev, page > 1);
    }
}
