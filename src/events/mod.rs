//! Lifecycle event fan-out for crawler tasks.

pub mod publisher;

// Re-export key types for convenience
pub use publisher::{EventPublisher, LifecycleEvent};
