//! Task lifecycle through the orchestrator facade: create, start, progress,
//! completion, graceful stop and forced cancel.

mod common;

use common::*;
use crawler_orchestrator::{
    lifecycle_events, CrawlerOrchestrator, OrchestratorError, StopReason, TaskConfig, TaskId,
    TaskStatus,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_simulated_task_runs_to_completion() {
    let orchestrator = CrawlerOrchestrator::new(test_config()).unwrap();
    let mut events = orchestrator.subscribe();

    let id = orchestrator
        .create_task("hospital_scan", TaskConfig::new().with_hospitals([11, 12, 13]))
        .unwrap();
    let started = orchestrator.start_task(id).await.unwrap();
    assert_eq!(started.status, TaskStatus::Running);
    assert!(started.start_time.is_some());

    let task = wait_for_terminal(&orchestrator, id).await;
    assert_eq!(task.status, TaskStatus::Stopped);
    assert_eq!(task.progress, 100);
    assert_eq!(task.stop_reason, Some(StopReason::Completed));
    assert!(task.end_time.is_some());
    assert!(task.error_message.is_none());

    let summary = task.result.expect("completed task carries a result");
    assert!(summary.completed);
    assert_eq!(summary.websites_scanned, 3);
    assert_eq!(summary.successful_scans, 3);

    let mut names = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(WAIT_LIMIT, events.recv())
            .await
            .expect("event published")
            .unwrap();
        assert_eq!(event.task_id, id);
        names.push(event.name);
    }
    assert_eq!(
        names,
        vec![
            lifecycle_events::TASK_CREATED,
            lifecycle_events::TASK_STARTED,
            lifecycle_events::TASK_COMPLETED,
        ]
    );
}

#[tokio::test]
async fn test_progress_never_decreases_while_running() {
    let gated = GatedScan::new(10);
    let orchestrator = orchestrator_with(Arc::new(gated.clone()));
    let id = orchestrator
        .create_task("tender_monitor", TaskConfig::default())
        .unwrap();
    orchestrator.start_task(id).await.unwrap();

    let mut observed = Vec::new();
    for _ in 0..10 {
        gated.release(1);
        tokio::task::yield_now().await;
        observed.push(orchestrator.get_task(id).unwrap().progress);
    }
    let task = wait_for_terminal(&orchestrator, id).await;
    observed.push(task.progress);

    assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]), "{observed:?}");
    assert_eq!(task.progress, 100);
}

#[tokio::test]
async fn test_starting_twice_fails_and_keeps_status() {
    let gated = GatedScan::new(5);
    let orchestrator = orchestrator_with(Arc::new(gated.clone()));
    let id = orchestrator
        .create_task("hospital_discovery", TaskConfig::default())
        .unwrap();
    assert_ok!(orchestrator.start_task(id).await);

    let err = assert_err!(orchestrator.start_task(id).await);
    assert!(matches!(err, OrchestratorError::InvalidTransition { .. }));
    assert!(err.is_recoverable());
    assert_eq!(orchestrator.get_task(id).unwrap().status, TaskStatus::Running);

    orchestrator.cancel_task(id).await.unwrap();
}

#[tokio::test]
async fn test_bogus_task_type_is_rejected_before_registration() {
    let orchestrator = CrawlerOrchestrator::new(test_config()).unwrap();

    let err = orchestrator
        .create_task("bogus", TaskConfig::default())
        .unwrap_err();
    assert_eq!(err, OrchestratorError::InvalidTaskType("bogus".to_string()));

    let err = orchestrator
        .trigger("bogus", TaskConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidTaskType(_)));
    assert!(orchestrator.list_all().is_empty());
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let orchestrator = CrawlerOrchestrator::new(test_config()).unwrap();
    let missing = TaskId::from_raw(404);

    assert_eq!(
        orchestrator.get_task(missing).unwrap_err(),
        OrchestratorError::NotFound(missing)
    );
    assert!(matches!(
        orchestrator.start_task(missing).await,
        Err(OrchestratorError::NotFound(_))
    ));
    assert!(matches!(
        orchestrator.stop_task(missing).await,
        Err(OrchestratorError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_stop_requires_running_or_paused() {
    let orchestrator = CrawlerOrchestrator::new(test_config()).unwrap();
    let id = orchestrator
        .create_task("hospital_scan", TaskConfig::default())
        .unwrap();

    let err = orchestrator.stop_task(id).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidTransition { .. }));
    assert_eq!(orchestrator.get_task(id).unwrap().status, TaskStatus::Created);
}

#[tokio::test]
async fn test_graceful_stop_finishes_in_flight_step() {
    let gated = GatedScan::new(10);
    let orchestrator = orchestrator_with(Arc::new(gated.clone()));
    let id = orchestrator
        .create_task("hospital_scan", TaskConfig::default())
        .unwrap();
    orchestrator.start_task(id).await.unwrap();

    gated.release(2);
    wait_for_progress(&orchestrator, id, 20).await;

    // The worker is blocked inside step 3; the stop lands after it completes
    let (stopped, ()) = tokio::join!(orchestrator.stop_task(id), async {
        tokio::task::yield_now().await;
        gated.release(1);
    });
    let task = stopped.unwrap();

    assert_eq!(task.status, TaskStatus::Stopped);
    assert_eq!(task.stop_reason, Some(StopReason::Stopped));
    assert_eq!(task.progress, 30);
    let summary = task.result.unwrap();
    assert!(!summary.completed);
    assert_eq!(summary.websites_scanned, 3);
    assert_eq!(gated.executed(), 3);
}

#[tokio::test]
async fn test_forced_cancel_interrupts_in_flight_step() {
    let gated = GatedScan::new(10);
    let orchestrator = orchestrator_with(Arc::new(gated.clone()));
    let id = orchestrator
        .create_task("tender_monitor", TaskConfig::default())
        .unwrap();
    orchestrator.start_task(id).await.unwrap();

    gated.release(1);
    wait_for_progress(&orchestrator, id, 10).await;

    let task = orchestrator.cancel_task(id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Stopped);
    assert_eq!(task.stop_reason, Some(StopReason::Cancelled));
    assert_eq!(task.progress, 10);
    assert!(task.end_time.is_some());
    assert_eq!(task.result.unwrap().websites_scanned, 1);
}

#[tokio::test]
async fn test_terminal_tasks_accept_no_transitions() {
    let gated = GatedScan::new(3);
    let orchestrator = orchestrator_with(Arc::new(gated.clone()));
    let id = orchestrator
        .create_task("hospital_scan", TaskConfig::default())
        .unwrap();
    orchestrator.start_task(id).await.unwrap();
    orchestrator.cancel_task(id).await.unwrap();

    for result in [
        orchestrator.start_task(id).await,
        orchestrator.stop_task(id).await,
        orchestrator.pause_task(id).await,
        orchestrator.resume_task(id).await,
    ] {
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidTransition { .. })
        ));
    }
    assert_eq!(orchestrator.get_task(id).unwrap().status, TaskStatus::Stopped);
}

#[tokio::test]
async fn test_registry_capacity_is_a_hard_failure() {
    let config = crawler_orchestrator::OrchestratorConfig {
        max_tracked_tasks: 2,
        ..test_config()
    };
    let orchestrator = CrawlerOrchestrator::new(config).unwrap();
    orchestrator.create_task("hospital_scan", TaskConfig::default()).unwrap();
    orchestrator.create_task("hospital_scan", TaskConfig::default()).unwrap();

    let err = orchestrator
        .create_task("hospital_scan", TaskConfig::default())
        .unwrap_err();
    assert_eq!(err, OrchestratorError::ResourceExhausted { limit: 2 });
    assert!(!err.is_recoverable());
    assert_eq!(orchestrator.list_all().len(), 2);
}
