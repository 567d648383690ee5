//! Execution-context-local "current task" / "current actor".
//!
//! Each resume pushes a frame for the task it enters and pops it when
//! control comes back, so the top frame always belongs to the task whose
//! body is executing right now. A task that resumes another task nests a
//! second frame on top of its own.
//!
//! A context task's frame also carries its live bindings, which is what
//! "the bindings active right now" means for code running on the actor
//! thread.

use std::cell::RefCell;
use std::rc::Rc;

use crate::domain::{ActorId, Bindings, TaskId};
use crate::error::TaskError;
use crate::task::TaskHandle;

#[derive(Clone)]
pub(crate) struct Frame {
    pub(crate) task: TaskHandle,
    pub(crate) actor: ActorId,
    pub(crate) context: Option<Rc<RefCell<Bindings>>>,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Pops its frame on drop, including during unwinding.
pub(crate) struct FrameGuard {
    task: TaskId,
}

pub(crate) fn enter(frame: Frame) -> FrameGuard {
    let task = frame.task.id();
    FRAMES.with(|frames| frames.borrow_mut().push(frame));
    FrameGuard { task }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let popped = FRAMES.with(|frames| frames.borrow_mut().pop());
        debug_assert_eq!(popped.map(|f| f.task.id()), Some(self.task));
    }
}

/// The task whose body is executing on this thread.
pub fn current_task() -> Result<TaskHandle, TaskError> {
    FRAMES
        .with(|frames| frames.borrow().last().map(|f| f.task.clone()))
        .ok_or(TaskError::NoCurrentTask)
}

/// The actor the executing task belongs to.
pub fn current_actor() -> Result<ActorId, TaskError> {
    FRAMES
        .with(|frames| frames.borrow().last().map(|f| f.actor))
        .ok_or(TaskError::NoCurrentTask)
}

/// Snapshot of the bindings of the innermost executing context task.
///
/// A plain task nested in a context task runs in that task's context.
/// `None` outside any context task.
pub fn current_bindings() -> Option<Bindings> {
    FRAMES.with(|frames| {
        frames
            .borrow()
            .iter()
            .rev()
            .find_map(|f| f.context.as_ref().map(|ctx| ctx.borrow().snapshot()))
    })
}

/// Is `task` the one executing right now?
pub(crate) fn is_current(task: TaskId) -> bool {
    FRAMES.with(|frames| frames.borrow().last().map(|f| f.task.id()) == Some(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_frame_means_no_current_task() {
        assert!(matches!(current_task(), Err(TaskError::NoCurrentTask)));
        assert!(matches!(current_actor(), Err(TaskError::NoCurrentTask)));
        assert_eq!(current_bindings(), None);
    }
}
