//! Node inputs with optional strictness enforcement.

use super::DataFrame;
use crate::errors::NodeError;
use serde::de::DeserializeOwned;

/// A read-only view of the frame handed to a node for one tick.
///
/// In strict mode, reading a key the node did not declare fails with
/// [`NodeError::UndeclaredInput`].
#[derive(Debug, Clone, Copy)]
pub struct NodeInputs<'a> {
    frame: &'a DataFrame,
    declared: &'a [String],
    node: &'a str,
    strict: bool,
}

impl<'a> NodeInputs<'a> {
    /// Creates new node inputs.
    #[must_use]
    pub fn new(frame: &'a DataFrame, declared: &'a [String], node: &'a str, strict: bool) -> Self {
        Self {
            frame,
            declared,
            node,
            strict,
        }
    }

    /// Creates permissive inputs over a whole frame.
    #[must_use]
    pub fn permissive(frame: &'a DataFrame, node: &'a str) -> Self {
        Self::new(frame, &[], node, false)
    }

    /// Gets a value.
    ///
    /// # Errors
    ///
    /// Returns `UndeclaredInput` in strict mode if `key` is not declared.
    pub fn get(&self, key: &str) -> Result<Option<&'a serde_json::Value>, NodeError> {
        if self.strict && !self.is_declared(key) {
            return Err(NodeError::UndeclaredInput {
                node: self.node.to_string(),
                key: key.to_string(),
            });
        }
        Ok(self.frame.get(key))
    }

    /// Gets a value that must be present.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` if absent, or `UndeclaredInput` in strict mode.
    pub fn require(&self, key: &str) -> Result<&'a serde_json::Value, NodeError> {
        self.get(key)?.ok_or_else(|| NodeError::missing_input(key))
    }

    /// Gets a present value and deserializes it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the value has the wrong shape.
    pub fn require_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, NodeError> {
        let value = self.require(key)?;
        T::deserialize(value).map_err(|e| NodeError::invalid_input(key, e.to_string()))
    }

    /// Gets a value without the strictness check.
    #[must_use]
    pub fn get_unchecked(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.frame.get(key)
    }

    /// Checks if the frame holds `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.frame.contains_key(key)
    }

    /// Returns the declared input keys.
    #[must_use]
    pub fn declared(&self) -> &'a [String] {
        self.declared
    }

    /// Returns whether strict mode is enabled.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Returns the entries the node may read: declared keys in strict mode,
    /// the whole frame otherwise.
    #[must_use]
    pub fn visible(&self) -> Vec<(&'a str, &'a serde_json::Value)> {
        if self.strict {
            self.declared
                .iter()
                .filter_map(|key| self.frame.get(key).map(|v| (key.as_str(), v)))
                .collect()
        } else {
            self.frame.iter().map(|(k, v)| (k.as_str(), v)).collect()
        }
    }

    fn is_declared(&self, key: &str) -> bool {
        self.declared.iter().any(|k| k == key)
    }
}
