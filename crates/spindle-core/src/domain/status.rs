//! Task status state machine.

use serde::{Deserialize, Serialize};

/// Task status.
///
/// State transitions:
/// - New -> Running (first resume)
/// - Running -> Suspended(tag) -> Running (suspend / resume pairs)
/// - New | Running | Suspended -> Dead
///
/// `tag` is whatever the body passed to `suspend`; it describes what the
/// task is waiting for and is never interpreted by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus<S> {
    /// Constructed, never resumed.
    New,

    /// Body is executing.
    Running,

    /// Body called `suspend(tag)` and waits for the next resume.
    Suspended(S),

    /// Body returned, failed, or was terminated.
    Dead,
}

/// Tag-free view of [`TaskStatus`], for type-erased observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    New,
    Running,
    Suspended,
    Dead,
}

impl<S> TaskStatus<S> {
    pub fn kind(&self) -> StatusKind {
        match self {
            TaskStatus::New => StatusKind::New,
            TaskStatus::Running => StatusKind::Running,
            TaskStatus::Suspended(_) => StatusKind::Suspended,
            TaskStatus::Dead => StatusKind::Dead,
        }
    }

    /// The waiting tag, if suspended.
    pub fn tag(&self) -> Option<&S> {
        match self {
            TaskStatus::Suspended(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> TaskStatus<&S> {
        match self {
            TaskStatus::New => TaskStatus::New,
            TaskStatus::Running => TaskStatus::Running,
            TaskStatus::Suspended(tag) => TaskStatus::Suspended(tag),
            TaskStatus::Dead => TaskStatus::Dead,
        }
    }

    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> TaskStatus<T> {
        match self {
            TaskStatus::New => TaskStatus::New,
            TaskStatus::Running => TaskStatus::Running,
            TaskStatus::Suspended(tag) => TaskStatus::Suspended(f(tag)),
            TaskStatus::Dead => TaskStatus::Dead,
        }
    }
}

impl StatusKind {
    /// Is the transition `self -> next` allowed by the state graph?
    pub fn can_transition_to(self, next: StatusKind) -> bool {
        use StatusKind::*;
        matches!(
            (self, next),
            (New, Running)
                | (New, Dead)
                | (Running, Suspended)
                | (Running, Dead)
                | (Suspended, Running)
                | (Suspended, Dead)
        )
    }
}
