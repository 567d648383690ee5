//! Actor port - タスクを所有するアクター

use crate::domain::{ActorId, Bindings, TaskId};
use crate::task::TaskHandle;

/// Collaborator interface a task needs from its owning actor.
///
/// All calls happen on the actor's own thread, so implementations need no
/// synchronization beyond interior mutability.
pub trait Actor {
    fn id(&self) -> ActorId;

    /// Add a task that just started executing to the live set.
    fn register(&self, task: TaskHandle);

    /// Remove a finished task. Returns false if it was not registered.
    fn deregister(&self, task: TaskId) -> bool;

    /// Ambient bindings currently active on the actor's thread.
    fn bindings(&self) -> Bindings;
}
