use crate::constants::events as names;
use crate::models::{Task, TaskId};
use crate::state_machine::{TaskEvent, TaskStatus};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast publisher for task lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<LifecycleEvent>,
}

/// A transition that has been applied to a task
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub name: &'static str,
    pub task_id: TaskId,
    pub from: Option<TaskStatus>,
    pub to: TaskStatus,
    pub occurred_at: DateTime<Utc>,
    pub context: Value,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a lifecycle event.
    ///
    /// A send with no live subscribers is not an error; slow subscribers
    /// observe `RecvError::Lagged` instead of blocking publishers.
    pub fn publish(&self, event: LifecycleEvent) {
        trace!(event = event.name, task_id = %event.task_id, "Publishing lifecycle event");
        let _ = self.sender.send(event);
    }

    /// Publish the event for a freshly created task
    pub fn task_created(&self, task: &Task) {
        self.publish(LifecycleEvent {
            name: names::TASK_CREATED,
            task_id: task.id,
            from: None,
            to: task.status,
            occurred_at: task.created_at,
            context: json!({
                "task_type": task.task_type,
                "priority": task.priority,
            }),
        });
    }

    /// Publish the event for an applied transition; `task` is the snapshot after it
    pub fn transition(&self, from: TaskStatus, event: &TaskEvent, task: &Task) {
        self.publish(LifecycleEvent {
            name: event_name(event),
            task_id: task.id,
            from: Some(from),
            to: task.status,
            occurred_at: task.updated_at,
            context: json!({
                "progress": task.progress,
                "result": task.result,
                "error_message": task.error_message,
            }),
        });
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

fn event_name(event: &TaskEvent) -> &'static str {
    match event {
        TaskEvent::Start => names::TASK_STARTED,
        TaskEvent::Pause => names::TASK_PAUSED,
        TaskEvent::Resume => names::TASK_RESUMED,
        TaskEvent::Stop(_) => names::TASK_STOPPED,
        TaskEvent::Cancel(_) => names::TASK_CANCELLED,
        TaskEvent::Complete(_) => names::TASK_COMPLETED,
        TaskEvent::Fail(_) => names::TASK_FAILED,
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskConfig, TaskType};

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::new(4);
        let task = Task::new(
            TaskId::from_raw(1),
            TaskType::HospitalScan,
            TaskConfig::default(),
            Utc::now(),
        );
        publisher.task_created(&task);

        // Late subscribers only see what is published after they subscribe
        let mut receiver = publisher.subscribe();
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_transitions() {
        let publisher = EventPublisher::new(4);
        let mut receiver = publisher.subscribe();
        let mut task = Task::new(
            TaskId::from_raw(2),
            TaskType::TenderMonitor,
            TaskConfig::default(),
            Utc::now(),
        );
        task.status = TaskStatus::Running;

        publisher.transition(TaskStatus::Created, &TaskEvent::Start, &task);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, names::TASK_STARTED);
        assert_eq!(event.from, Some(TaskStatus::Created));
        assert_eq!(event.to, TaskStatus::Running);
        assert_eq!(event.task_id, TaskId::from_raw(2));
    }
}
