//! Observability: live-task counts and logging setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Snapshot of an actor's live-task set by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub running: usize,
    pub suspended: usize,
    /// Entries in a status that should never be live (New / Dead).
    pub other: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.running + self.suspended + self.other
    }
}

/// Install a `fmt` subscriber filtered by `filter` (e.g. `"spindle_core=debug"`).
///
/// `RUST_LOG` wins when set. Returns false if a global subscriber was
/// already installed; calling this twice is harmless.
pub fn init_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_every_bucket() {
        let counts = TaskCounts {
            running: 1,
            suspended: 2,
            other: 0,
        };
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn init_logging_twice_is_harmless() {
        init_logging("debug");
        assert!(!init_logging("debug"));
    }
}
