//! Actor configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for one actor and its mailbox driver.
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Diagnostic name of the actor.
    pub name: String,

    /// Capacity of the command mailbox. Must be > 0.
    pub mailbox_capacity: usize,

    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            name: "actor".to_string(),
            mailbox_capacity: 64,
            log_filter: "info".to_string(),
        }
    }
}

impl ActorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "mailbox_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
