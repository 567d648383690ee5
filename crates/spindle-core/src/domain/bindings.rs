//! Bindings - タスクごとのコンテキスト変数
//!
//! Several tasks share one actor thread, so per-call context that would
//! otherwise live in thread-local storage is carried as an explicit,
//! ordered snapshot and handed across every suspend/resume boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys owned by the runtime itself. They are never copied into or out of a
/// task's bindings.
pub const RESERVED_KEYS: [&str; 2] = ["__current_task__", "__current_actor__"];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Ordered key -> value context bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, Value>);

impl Bindings {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copy of these bindings without the reserved runtime keys.
    ///
    /// Every capture and every install goes through this, in both
    /// directions.
    pub fn snapshot(&self) -> Bindings {
        Bindings(
            self.0
                .iter()
                .filter(|(key, _)| !is_reserved(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Replace the non-reserved entries with those of `incoming`.
    ///
    /// Reserved keys already present in `self` stay untouched; reserved keys
    /// in `incoming` are ignored.
    pub fn install(&mut self, incoming: &Bindings) {
        self.0.retain(|key, _| is_reserved(key));
        for (key, value) in incoming.iter() {
            if !is_reserved(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Bindings(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
