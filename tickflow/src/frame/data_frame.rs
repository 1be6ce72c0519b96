//! The per-tick key-value frame.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved key a node sets to `true` to ask the runner to stop.
pub const PIPELINE_END_KEY: &str = "pipeline_end";

/// Accumulated state of one tick.
///
/// Owned by the running tick and moved through the node chain. Merging node
/// outputs overwrites existing keys; write-once-per-key is a convention, not
/// enforced here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataFrame {
    data: HashMap<String, serde_json::Value>,
}

impl DataFrame {
    /// Creates a new empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frame from existing data.
    #[must_use]
    pub fn from_data(data: HashMap<String, serde_json::Value>) -> Self {
        Self { data }
    }

    /// Returns the frame with `key` set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Gets a value from the frame.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Sets a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
        self.data.insert(key.into(), value)
    }

    /// Merges a node's outputs into the frame. Later writes win.
    pub fn merge(&mut self, outputs: impl IntoIterator<Item = (String, serde_json::Value)>) {
        self.data.extend(outputs);
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Removes every entry, keeping the allocation for the next tick.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the frame is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Iterates over entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.data.iter()
    }

    /// Returns true if a node asked the runner to stop.
    #[must_use]
    pub fn is_pipeline_end(&self) -> bool {
        self.data
            .get(PIPELINE_END_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Consumes the frame and returns its data.
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, serde_json::Value> {
        self.data
    }
}

impl FromIterator<(String, serde_json::Value)> for DataFrame {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}
