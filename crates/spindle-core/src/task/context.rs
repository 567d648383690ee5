//! ContextTask - コンテキスト変数を引き継ぐタスク
//!
//! Tasks of one actor share a thread, so anything a body would keep in
//! thread-local storage has to travel with the task instead. A
//! `ContextTask` starts from a snapshot of the bindings active where it is
//! created (the enclosing context task's, else the actor's), hands its
//! current bindings out at every `suspend`, and takes back whatever the
//! resumer hands in at the next `resume`. Reserved runtime keys never cross
//! in either direction.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use super::{Suspender, Task, TaskHandle};
use crate::domain::{ActorId, Bindings, StatusKind, TaskId, TaskStatus, TaskType};
use crate::error::TaskError;
use crate::ports::Actor;
use crate::scope;

/// Status tag plus the bindings captured when the task suspended.
#[derive(Debug, Clone, PartialEq)]
pub struct Captured<S> {
    pub status: S,
    pub bindings: Bindings,
}

/// Resume value plus the bindings to install. `None` keeps the task's own.
struct Handoff<V> {
    value: V,
    bindings: Option<Bindings>,
}

pub struct ContextTask<S, V> {
    task: Task<Captured<S>, Handoff<V>>,
}

/// Body-side handle of a [`ContextTask`]: suspends and owns the task's
/// bindings.
pub struct ContextSuspender<S, V> {
    inner: Suspender<Captured<S>, Handoff<V>>,
    bindings: Rc<RefCell<Bindings>>,
}

impl<S: 'static, V: 'static> ContextTask<S, V> {
    /// Create a task starting from the bindings active right now: those of
    /// the executing context task when called from inside one, otherwise
    /// the actor's ambient bindings.
    pub fn new<A, F, Fut>(actor: &Rc<A>, task_type: impl Into<TaskType>, body: F) -> Self
    where
        A: Actor + 'static,
        F: FnOnce(ContextSuspender<S, V>) -> Fut + 'static,
        Fut: Future<Output = Result<(), TaskError>> + 'static,
    {
        let bindings = scope::current_bindings().unwrap_or_else(|| actor.bindings());
        Self::with_bindings(actor, task_type, &bindings, body)
    }

    /// Create a task starting from `bindings`, e.g. a parent task's
    /// [`ContextSuspender::bindings`].
    pub fn with_bindings<A, F, Fut>(
        actor: &Rc<A>,
        task_type: impl Into<TaskType>,
        bindings: &Bindings,
        body: F,
    ) -> Self
    where
        A: Actor + 'static,
        F: FnOnce(ContextSuspender<S, V>) -> Fut + 'static,
        Fut: Future<Output = Result<(), TaskError>> + 'static,
    {
        let mut own = Bindings::new();
        own.install(bindings);
        let shared = Rc::new(RefCell::new(own));
        let for_body = Rc::clone(&shared);
        let task = Task::build(actor, task_type, Some(shared), move |inner| async move {
            body(ContextSuspender {
                inner,
                bindings: for_body,
            })
            .await
        });
        Self { task }
    }

    /// Resume, handing back the bindings the task suspended with.
    pub fn resume(&self, value: V) -> Result<(), TaskError> {
        self.task.resume(Handoff {
            value,
            bindings: None,
        })
    }

    /// Resume, installing `bindings` into the task before its body continues.
    ///
    /// On the very first resume the body has not suspended yet, so the
    /// value and bindings are dropped like any first resume value.
    pub fn resume_with(&self, value: V, bindings: Bindings) -> Result<(), TaskError> {
        self.task.resume(Handoff {
            value,
            bindings: Some(bindings),
        })
    }

    pub fn terminate(&self) -> Result<(), TaskError> {
        self.task.terminate()
    }

    pub fn handle(&self) -> TaskHandle {
        self.task.handle()
    }
}

impl<S, V> ContextTask<S, V> {
    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    pub fn task_type(&self) -> &TaskType {
        self.task.task_type()
    }

    pub fn actor_id(&self) -> ActorId {
        self.task.actor_id()
    }

    pub fn status(&self) -> TaskStatus<S>
    where
        S: Clone,
    {
        self.task
            .with_status(|status| status.as_ref().map(|captured| captured.status.clone()))
    }

    pub fn status_kind(&self) -> StatusKind {
        self.task.status_kind()
    }

    pub fn is_alive(&self) -> bool {
        self.task.is_alive()
    }

    /// Bindings captured at the last `suspend`, while the task is suspended.
    pub fn suspended_bindings(&self) -> Option<Bindings> {
        self.task
            .with_status(|status| status.tag().map(|captured| captured.bindings.clone()))
    }
}

impl<S, V> ContextSuspender<S, V> {
    pub fn task_id(&self) -> TaskId {
        self.inner.task_id()
    }

    /// Snapshot of the task's bindings, reserved keys excluded.
    pub fn bindings(&self) -> Bindings {
        self.bindings.borrow().snapshot()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.bindings.borrow().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.bindings.borrow_mut().insert(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.bindings.borrow_mut().remove(key)
    }

    /// Suspend like [`Suspender::suspend`], handing out the current
    /// bindings and installing the ones handed back.
    pub async fn suspend(&self, status: S) -> Result<V, TaskError> {
        let captured = Captured {
            status,
            bindings: self.bindings(),
        };
        let handoff = self.inner.suspend(captured).await?;
        if let Some(incoming) = handoff.bindings {
            trace!(task = %self.task_id(), count = incoming.len(), "installing bindings");
            self.bindings.borrow_mut().install(&incoming);
        }
        Ok(handoff.value)
    }
}
