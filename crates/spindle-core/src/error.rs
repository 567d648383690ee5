use thiserror::Error;

use crate::domain::TaskId;

/// Failures reported by the coroutine primitive itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoroutineError {
    /// The body already returned (or was closed).
    #[error("coroutine is dead")]
    Dead,

    /// `resume` was called while the coroutine was already executing.
    #[error("coroutine is already running")]
    AlreadyRunning,

    /// The body parked on something other than its own yield point.
    #[error("coroutine stalled on a foreign await point")]
    Stalled,

    /// The body panicked; the coroutine is dead afterwards.
    #[error("coroutine panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("cannot resume dead task {0}")]
    DeadTask(TaskId),

    /// Delivered to a suspended body when its task is terminated.
    #[error("task terminated")]
    Terminated,

    #[error("no current task")]
    NoCurrentTask,

    /// Failure reported by a task body.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Coroutine(#[from] CoroutineError),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
