// State machine module for crawler task lifecycle management
//
// Transitions are pure: the machine validates an event against the current
// status and applies the resulting field changes to a task record. The
// registry runs it inside its per-task critical section so check and mutate
// happen atomically.

pub mod errors;
pub mod events;
pub mod states;
pub mod task_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::TaskEvent;
pub use states::TaskStatus;
pub use task_state_machine::{TaskStateMachine, MAX_PROGRESS};
