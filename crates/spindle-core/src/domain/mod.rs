//! Domain model (IDs, labels, status, resume payloads, bindings).

pub mod bindings;
pub mod ids;
pub mod resume;
pub mod status;
pub mod task_type;

pub use bindings::{Bindings, RESERVED_KEYS};
pub use ids::{ActorId, TaskId};
pub use resume::Resume;
pub use status::{StatusKind, TaskStatus};
pub use task_type::TaskType;
