//! Ports - 外部コラボレーターとの境界
//!
//! The task core only needs one collaborator: the actor that owns the
//! live-task set. Everything else (mailbox, timers, supervision) sits above
//! it and talks to tasks through `resume` / `terminate`.

pub mod actor;

pub use self::actor::Actor;
