//! Shared data structures for the orchestrator
//!
//! This crate contains the task model, the task state machine, and the wire
//! types used by both the manager and worker components.

pub mod api;
pub mod defaults;
pub mod task;

// Re-export commonly used types for convenience
pub use api::ErrorResponse;
pub use task::{valid_transition, State, Task, TaskEvent};

/// Result type alias used throughout the shared crate
pub type Result<T> = anyhow::Result<T>;

/// Common error types for the orchestrator
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: uuid::Uuid,
        from: task::State,
        to: task::State,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}
