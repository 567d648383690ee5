//! LocalActor - 単一スレッドのアクター実装
//!
//! Owns the live-task set and the ambient bindings of one actor thread.
//! Nothing here is `Send`: the actor, its tasks, and its set all stay on the
//! thread that created them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{ActorId, Bindings, StatusKind, TaskId};
use crate::error::TaskError;
use crate::observability::TaskCounts;
use crate::ports::Actor;
use crate::task::TaskHandle;

pub struct LocalActor {
    id: ActorId,
    name: String,
    tasks: RefCell<BTreeMap<TaskId, TaskHandle>>,
    bindings: RefCell<Bindings>,
}

impl LocalActor {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: ActorId::generate(),
            name: name.into(),
            tasks: RefCell::new(BTreeMap::new()),
            bindings: RefCell::new(Bindings::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set an ambient binding on the actor thread. Tasks created afterwards
    /// start with it.
    pub fn set_binding(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.bindings.borrow_mut().insert(key, value)
    }

    pub fn remove_binding(&self, key: &str) -> Option<Value> {
        self.bindings.borrow_mut().remove(key)
    }

    pub fn contains_task(&self, task: TaskId) -> bool {
        self.tasks.borrow().contains_key(&task)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Handles to every live task, in id order.
    pub fn live_tasks(&self) -> Vec<TaskHandle> {
        self.tasks.borrow().values().cloned().collect()
    }

    pub fn counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for task in self.tasks.borrow().values() {
            match task.status_kind() {
                StatusKind::Running => counts.running += 1,
                StatusKind::Suspended => counts.suspended += 1,
                // not expected in the live set
                StatusKind::New | StatusKind::Dead => counts.other += 1,
            }
        }
        counts
    }

    /// Terminate every live task, e.g. on shutdown.
    ///
    /// Keeps going past failures and returns the first one.
    pub fn terminate_all(&self) -> Result<(), TaskError> {
        let live = self.live_tasks();
        debug!(actor = %self.id, count = live.len(), "terminating live tasks");

        let mut first_err = None;
        for task in live {
            if let Err(err) = task.terminate() {
                warn!(actor = %self.id, task = %task.id(), error = %err, "terminate failed");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Actor for LocalActor {
    fn id(&self) -> ActorId {
        self.id
    }

    fn register(&self, task: TaskHandle) {
        let id = task.id();
        if self.tasks.borrow_mut().insert(id, task).is_some() {
            warn!(actor = %self.id, task = %id, "task registered twice");
        }
    }

    fn deregister(&self, task: TaskId) -> bool {
        let removed = self.tasks.borrow_mut().remove(&task);
        removed.is_some()
    }

    fn bindings(&self) -> Bindings {
        self.bindings.borrow().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn bindings_snapshot_skips_reserved_keys() {
        let actor = LocalActor::new("a");
        actor.set_binding("locale", "ja");
        actor.set_binding("__current_actor__", "internal");

        let snapshot = actor.bindings();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("locale"));
    }

    #[test]
    fn counts_reflect_live_tasks() {
        let actor = LocalActor::new("a");
        let waiting: Task<&str, ()> = Task::new(&actor, "wait", |s| async move {
            s.suspend("waiting").await?;
            Ok(())
        });
        let idle: Task<&str, ()> = Task::new(&actor, "idle", |_| async { Ok(()) });

        waiting.resume(()).unwrap();

        let counts = actor.counts();
        assert_eq!(counts.suspended, 1);
        assert_eq!(counts.running, 0);
        assert_eq!(actor.task_count(), 1);
        assert!(!actor.contains_task(idle.id()));
    }

    #[test]
    fn terminate_all_empties_the_live_set() {
        let actor = LocalActor::new("a");
        let tasks: Vec<Task<u8, ()>> = (0..3)
            .map(|i| {
                Task::new(&actor, "loop", move |s| async move {
                    loop {
                        s.suspend(i).await?;
                    }
                })
            })
            .collect();
        for task in &tasks {
            task.resume(()).unwrap();
        }
        assert_eq!(actor.task_count(), 3);

        actor.terminate_all().unwrap();

        assert_eq!(actor.task_count(), 0);
        assert!(tasks.iter().all(|t| !t.is_alive()));
    }
}
