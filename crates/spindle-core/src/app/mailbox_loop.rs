//! MailboxLoop - アクターのメールボックスからタスクを駆動するループ
//!
//! # フロー
//! 1. `spawn()` でタスクを開始（最初の resume）して保持
//! 2. mailbox から Command を受け取り、該当タスクを resume / terminate
//! 3. shutdown が来たら、アクターの live set にある全タスクを terminate
//!
//! Everything runs on the actor's thread: drive the loop with a
//! current-thread runtime or inside a `LocalSet`. Producers on other threads
//! only touch the `mpsc::Sender`.

use std::collections::HashMap;
use std::rc::Rc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::config::ActorConfig;
use crate::domain::{Bindings, TaskId};
use crate::error::TaskError;
use crate::impls::LocalActor;
use crate::task::{ContextTask, Task};

/// A message for one task of the actor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<V> {
    Resume { task: TaskId, value: V },
    /// Resume a context task, installing `bindings` first. A plain task
    /// is resumed with `value` only and the bindings are dropped.
    ResumeWith {
        task: TaskId,
        value: V,
        bindings: Bindings,
    },
    Terminate(TaskId),
}

impl<V> Command<V> {
    pub fn task(&self) -> TaskId {
        match self {
            Command::Resume { task, .. } => *task,
            Command::ResumeWith { task, .. } => *task,
            Command::Terminate(task) => *task,
        }
    }
}

/// What the loop needs from a task it drives.
pub trait Drivable<V> {
    fn id(&self) -> TaskId;

    fn resume(&self, value: V) -> Result<(), TaskError>;

    /// Plain tasks carry no bindings; they are dropped and the task is
    /// resumed with `value` alone.
    fn resume_with(&self, value: V, bindings: Bindings) -> Result<(), TaskError> {
        if !bindings.is_empty() {
            debug!(task = %self.id(), count = bindings.len(), "plain task ignores handed-in bindings");
        }
        self.resume(value)
    }

    fn terminate(&self) -> Result<(), TaskError>;

    fn is_alive(&self) -> bool;
}

impl<S: 'static, V: 'static> Drivable<V> for Task<S, V> {
    fn id(&self) -> TaskId {
        Task::id(self)
    }

    fn resume(&self, value: V) -> Result<(), TaskError> {
        Task::resume(self, value)
    }

    fn terminate(&self) -> Result<(), TaskError> {
        Task::terminate(self)
    }

    fn is_alive(&self) -> bool {
        Task::is_alive(self)
    }
}

impl<S: 'static, V: 'static> Drivable<V> for ContextTask<S, V> {
    fn id(&self) -> TaskId {
        ContextTask::id(self)
    }

    fn resume(&self, value: V) -> Result<(), TaskError> {
        ContextTask::resume(self, value)
    }

    fn resume_with(&self, value: V, bindings: Bindings) -> Result<(), TaskError> {
        ContextTask::resume_with(self, value, bindings)
    }

    fn terminate(&self) -> Result<(), TaskError> {
        ContextTask::terminate(self)
    }

    fn is_alive(&self) -> bool {
        ContextTask::is_alive(self)
    }
}

pub struct MailboxLoop<V> {
    actor: Rc<LocalActor>,
    tasks: HashMap<TaskId, Box<dyn Drivable<V>>>,
}

/// Create the mailbox channel sized by `config`.
pub fn mailbox<V>(config: &ActorConfig) -> (mpsc::Sender<Command<V>>, mpsc::Receiver<Command<V>>) {
    mpsc::channel(config.mailbox_capacity.max(1))
}

impl<V: 'static> MailboxLoop<V> {
    pub fn new(actor: Rc<LocalActor>) -> Self {
        Self {
            actor,
            tasks: HashMap::new(),
        }
    }

    pub fn actor(&self) -> &Rc<LocalActor> {
        &self.actor
    }

    /// Number of tasks this loop still tracks.
    pub fn tracked(&self) -> usize {
        self.tasks.len()
    }

    /// Start `task` with `first` and keep it for later commands.
    pub fn spawn(&mut self, task: impl Drivable<V> + 'static, first: V) -> Result<TaskId, TaskError> {
        let id = task.id();
        task.resume(first)?;
        if task.is_alive() {
            self.tasks.insert(id, Box::new(task));
        }
        Ok(id)
    }

    /// Apply one command.
    ///
    /// Commands for unknown or already-dead tasks are logged and dropped:
    /// a timer may fire after its task finished or was terminated.
    pub fn handle(&mut self, command: Command<V>) -> Result<(), TaskError> {
        let id = command.task();
        let Some(task) = self.tasks.get(&id) else {
            warn!(task = %id, "command for unknown task dropped");
            return Ok(());
        };

        let outcome = match command {
            Command::Resume { value, .. } => task.resume(value),
            Command::ResumeWith {
                value, bindings, ..
            } => task.resume_with(value, bindings),
            Command::Terminate(_) => task.terminate(),
        };

        if !task.is_alive() {
            self.tasks.remove(&id);
        }

        match outcome {
            Err(TaskError::DeadTask(dead)) => {
                warn!(task = %dead, "resume of dead task ignored");
                Ok(())
            }
            other => other,
        }
    }

    /// Process commands until shutdown is signalled (or its sender is
    /// dropped) or the mailbox closes, then terminate every live task.
    pub async fn run(
        mut self,
        mut mailbox: mpsc::Receiver<Command<V>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), TaskError> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let command = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                command = mailbox.recv() => command,
            };

            let Some(command) = command else {
                debug!(actor = %self.actor.name(), "mailbox closed");
                break;
            };

            if let Err(err) = self.handle(command) {
                warn!(actor = %self.actor.name(), error = %err, "task failed");
            }
        }

        self.shutdown()
    }

    /// Terminate every live task of the actor and forget the tracked ones.
    pub fn shutdown(&mut self) -> Result<(), TaskError> {
        debug!(actor = %self.actor.name(), live = self.actor.task_count(), "shutting down");
        let result = self.actor.terminate_all();
        self.tasks.clear();
        result
    }
}
