//! Task runtime error types.

use crate::task::TaskId;
use annotext_core::EngineError;
use thiserror::Error;

/// Errors surfaced by the task runtime and editing commands.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Unknown task {0}")]
    UnknownTask(TaskId),

    #[error("Unknown task implementation '{0}'")]
    UnknownImpl(String),

    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Task table lock poisoned")]
    Poisoned,
}
