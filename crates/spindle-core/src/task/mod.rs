//! Task - アクターの中で動く再開可能な実行単位
//!
//! A task owns one coroutine. Whoever drives the actor calls
//! [`Task::resume`]; the body hands control back with
//! [`Suspender::suspend`], reporting a status tag. The two alternate until
//! the body returns or the task is terminated.
//!
//! Lifecycle:
//! 1. `Task::new` builds the coroutine. Status `New`, not registered.
//! 2. First `resume`: status `Running`, the task registers itself in the
//!    actor's live set, then the body starts.
//! 3. `suspend(tag)` / `resume(v)` pairs: `Running <-> Suspended(tag)`.
//! 4. Body returns, fails, or is terminated: deregistered, status `Dead`.

pub mod context;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::coroutine::{Coroutine, CoroutineState, Yielder};
use crate::domain::{ActorId, Bindings, Resume, StatusKind, TaskId, TaskStatus, TaskType};
use crate::error::{CoroutineError, TaskError};
use crate::ports::Actor;
use crate::scope::{self, Frame};

pub use self::context::{Captured, ContextSuspender, ContextTask};

/// Type-erased view of a task, as held by the actor's live set.
pub trait TaskControl {
    fn id(&self) -> TaskId;

    fn task_type(&self) -> &TaskType;

    fn actor(&self) -> ActorId;

    fn status_kind(&self) -> StatusKind;

    /// False once the body has returned or been terminated.
    fn is_alive(&self) -> bool {
        self.status_kind() != StatusKind::Dead
    }

    /// Cooperative termination. See [`Task::terminate`].
    fn terminate(&self) -> Result<(), TaskError>;
}

pub type TaskHandle = Rc<dyn TaskControl>;

type TaskCoroutine<S, V> = Coroutine<S, Resume<V>, Result<(), TaskError>>;

/// A resumable task suspending with `S` tags and resumed with `V` values.
///
/// `Task` is a cheap handle; clones drive the same task.
pub struct Task<S, V> {
    inner: Rc<TaskInner<S, V>>,
}

struct TaskInner<S, V> {
    this: Weak<TaskInner<S, V>>,
    id: TaskId,
    task_type: TaskType,
    actor_id: ActorId,
    status: RefCell<TaskStatus<S>>,
    cancelled: Rc<Cell<bool>>,
    /// Live bindings of a context task, published in its scope frame.
    context: Option<Rc<RefCell<Bindings>>>,
    coroutine: RefCell<TaskCoroutine<S, V>>,
}

/// Handle the body uses to suspend its own task.
pub struct Suspender<S, V> {
    task: TaskId,
    cancelled: Rc<Cell<bool>>,
    yielder: Yielder<S, Resume<V>>,
}

/// Keeps a started task in its actor's live set; removes it on drop.
///
/// Lives inside the coroutine, so it drops when the body finishes, fails,
/// panics, or the coroutine is closed.
struct Registration {
    actor: Weak<dyn Actor>,
    task: TaskId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(actor) = self.actor.upgrade() else {
            return;
        };
        if !actor.deregister(self.task) {
            warn!(task = %self.task, actor = %actor.id(), "task was not in the live set");
        }
    }
}

impl<S: 'static, V: 'static> Task<S, V> {
    /// Create a task owned by `actor` that will run `body` on first resume.
    pub fn new<A, F, Fut>(actor: &Rc<A>, task_type: impl Into<TaskType>, body: F) -> Self
    where
        A: Actor + 'static,
        F: FnOnce(Suspender<S, V>) -> Fut + 'static,
        Fut: Future<Output = Result<(), TaskError>> + 'static,
    {
        Self::build(actor, task_type, None, body)
    }

    pub(crate) fn build<A, F, Fut>(
        actor: &Rc<A>,
        task_type: impl Into<TaskType>,
        context: Option<Rc<RefCell<Bindings>>>,
        body: F,
    ) -> Self
    where
        A: Actor + 'static,
        F: FnOnce(Suspender<S, V>) -> Fut + 'static,
        Fut: Future<Output = Result<(), TaskError>> + 'static,
    {
        let id = TaskId::generate();
        let task_type = task_type.into();
        let actor_id = actor.id();
        let owner: Weak<dyn Actor> = Rc::downgrade(actor) as Weak<dyn Actor>;
        let cancelled = Rc::new(Cell::new(false));

        let inner = Rc::new_cyclic(|this: &Weak<TaskInner<S, V>>| {
            let this_for_body = this.clone();
            let cancelled_for_body = Rc::clone(&cancelled);
            let coroutine = Coroutine::new(move |yielder| async move {
                let suspender = Suspender {
                    task: id,
                    cancelled: cancelled_for_body,
                    yielder,
                };
                let _registration = register(&this_for_body, owner);
                match body(suspender).await {
                    Ok(()) => Ok(()),
                    Err(TaskError::Terminated) => {
                        debug!(task = %id, "task terminated");
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            });

            TaskInner {
                this: this.clone(),
                id,
                task_type,
                actor_id,
                status: RefCell::new(TaskStatus::New),
                cancelled,
                context,
                coroutine: RefCell::new(coroutine),
            }
        });

        trace!(task = %id, task_type = %inner.task_type, actor = %actor_id, "task created");
        Self { inner }
    }
}

fn register<S: 'static, V: 'static>(
    this: &Weak<TaskInner<S, V>>,
    actor: Weak<dyn Actor>,
) -> Option<Registration> {
    let task = this.upgrade()?;
    let Some(owner) = actor.upgrade() else {
        warn!(task = %task.id, "owning actor is gone; task runs unregistered");
        return None;
    };
    debug!(task = %task.id, task_type = %task.task_type, actor = %owner.id(), "task started");
    owner.register(task.clone() as TaskHandle);
    Some(Registration {
        actor,
        task: task.id,
    })
}

/// The task whose body is executing on this thread.
///
/// Fails with [`TaskError::NoCurrentTask`] outside any task.
pub fn current() -> Result<TaskHandle, TaskError> {
    scope::current_task()
}

impl<S, V> Task<S, V> {
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.inner.task_type
    }

    pub fn actor_id(&self) -> ActorId {
        self.inner.actor_id
    }

    pub fn status(&self) -> TaskStatus<S>
    where
        S: Clone,
    {
        self.inner.status.borrow().clone()
    }

    /// Inspect the status without cloning the tag.
    pub fn with_status<T>(&self, f: impl FnOnce(&TaskStatus<S>) -> T) -> T {
        f(&self.inner.status.borrow())
    }

    pub fn status_kind(&self) -> StatusKind {
        self.inner.status.borrow().kind()
    }

    pub fn is_alive(&self) -> bool {
        self.status_kind() != StatusKind::Dead
    }
}

impl<S: 'static, V: 'static> Task<S, V> {
    /// Hand `value` to the task and run it until it suspends or finishes.
    ///
    /// The first resume starts the body (the value is dropped). Fails with
    /// [`TaskError::DeadTask`] once the body has finished, and with
    /// [`CoroutineError::AlreadyRunning`] if the task is executing right now.
    /// Errors returned by the body, other than `Terminated`, come back here.
    pub fn resume(&self, value: V) -> Result<(), TaskError> {
        self.inner.transfer(Resume::Value(value))
    }

    /// Ask the task to stop at its next suspension point.
    ///
    /// - finished: no-op.
    /// - never started: dropped without running; it was never registered.
    /// - suspended: its pending `suspend` fails with `Terminated`, the body
    ///   unwinds, and the task deregisters before this returns.
    /// - executing right now (called from its own body): recorded, and the
    ///   body's next `suspend` fails with `Terminated` instead of yielding.
    pub fn terminate(&self) -> Result<(), TaskError> {
        self.inner.cancel()
    }

    pub fn handle(&self) -> TaskHandle {
        Rc::clone(&self.inner) as TaskHandle
    }
}

impl<S: 'static, V: 'static> TaskInner<S, V> {
    fn set_status(&self, next: TaskStatus<S>) {
        let mut status = self.status.borrow_mut();
        debug_assert!(
            status.kind().can_transition_to(next.kind()),
            "illegal transition {:?} -> {:?}",
            status.kind(),
            next.kind()
        );
        *status = next;
    }

    fn transfer(&self, input: Resume<V>) -> Result<(), TaskError> {
        let Ok(mut coroutine) = self.coroutine.try_borrow_mut() else {
            return Err(CoroutineError::AlreadyRunning.into());
        };
        if !coroutine.is_alive() {
            return Err(TaskError::DeadTask(self.id));
        }
        let Some(handle) = self.this.upgrade() else {
            return Err(TaskError::DeadTask(self.id));
        };

        if input.is_cancel() {
            self.cancelled.set(true);
        } else {
            self.set_status(TaskStatus::Running);
        }

        let outcome = {
            let _frame = scope::enter(Frame {
                task: handle as TaskHandle,
                actor: self.actor_id,
                context: self.context.clone(),
            });
            coroutine.resume(input)
        };

        match outcome {
            Ok(CoroutineState::Yielded(tag)) => {
                trace!(task = %self.id, "task suspended");
                self.set_status(TaskStatus::Suspended(tag));
                Ok(())
            }
            Ok(CoroutineState::Complete(result)) => {
                debug!(task = %self.id, ok = result.is_ok(), "task finished");
                self.set_status(TaskStatus::Dead);
                result
            }
            Err(CoroutineError::Dead) => Err(TaskError::DeadTask(self.id)),
            Err(err) => {
                warn!(task = %self.id, error = %err, "task coroutine failed");
                self.set_status(TaskStatus::Dead);
                Err(err.into())
            }
        }
    }

    fn cancel(&self) -> Result<(), TaskError> {
        {
            let Ok(mut coroutine) = self.coroutine.try_borrow_mut() else {
                debug!(task = %self.id, "terminate requested while running");
                self.cancelled.set(true);
                return Ok(());
            };
            if !coroutine.is_alive() {
                return Ok(());
            }
            if !coroutine.is_started() {
                debug!(task = %self.id, "task terminated before start");
                coroutine.close();
                self.set_status(TaskStatus::Dead);
                return Ok(());
            }
        }

        match self.transfer(Resume::Cancel) {
            // 完了と終了要求が競合した場合
            Err(TaskError::DeadTask(_)) => Ok(()),
            other => other,
        }
    }
}

impl<S: 'static, V: 'static> TaskControl for TaskInner<S, V> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    fn actor(&self) -> ActorId {
        self.actor_id
    }

    fn status_kind(&self) -> StatusKind {
        self.status.borrow().kind()
    }

    fn terminate(&self) -> Result<(), TaskError> {
        self.cancel()
    }
}

impl<S, V> Suspender<S, V> {
    pub fn task_id(&self) -> TaskId {
        self.task
    }

    /// Hand control back to the resumer, reporting `status`.
    ///
    /// Returns the value of the next `resume`, or `Err(Terminated)` if the
    /// task was terminated. Fails with `NoCurrentTask` when awaited outside
    /// this task's own execution.
    pub async fn suspend(&self, status: S) -> Result<V, TaskError> {
        if !scope::is_current(self.task) {
            return Err(TaskError::NoCurrentTask);
        }
        if self.cancelled.get() {
            return Err(TaskError::Terminated);
        }
        match self.yielder.suspend(status).await {
            Resume::Value(value) => Ok(value),
            Resume::Cancel => Err(TaskError::Terminated),
        }
    }
}

impl<S, V> Clone for Task<S, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, V> fmt::Debug for Task<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("task_type", &self.inner.task_type)
            .field("status", &self.status_kind())
            .finish()
    }
}
