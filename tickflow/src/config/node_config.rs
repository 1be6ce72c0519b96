//! Immutable, resolved configuration of a single node.

use crate::errors::NodeError;
use crate::identifier::NodeIdentifier;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Reserved key holding the search root's base directory.
pub const ROOT_KEY: &str = "root";
/// Conventional key listing a node's required frame keys.
pub const INPUT_KEY: &str = "input";
/// Conventional key listing a node's produced frame keys.
pub const OUTPUT_KEY: &str = "output";
/// List entry meaning "no keys".
pub const NONE_MARKER: &str = "none";

/// Configuration for one node: defaults merged with overrides, plus `root`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    identifier: NodeIdentifier,
    values: serde_json::Map<String, serde_json::Value>,
    root: PathBuf,
}

impl NodeConfig {
    /// Creates a configuration, injecting `root` into the values.
    #[must_use]
    pub fn new(
        identifier: NodeIdentifier,
        mut values: serde_json::Map<String, serde_json::Value>,
        root: impl Into<PathBuf>,
    ) -> Self {
        let root = root.into();
        values.insert(
            ROOT_KEY.to_string(),
            serde_json::Value::String(root.to_string_lossy().into_owned()),
        );
        Self {
            identifier,
            values,
            root,
        }
    }

    /// Creates a configuration from a JSON object literal. Mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an object.
    pub fn from_json(
        identifier: NodeIdentifier,
        value: serde_json::Value,
        root: impl Into<PathBuf>,
    ) -> Result<Self, NodeError> {
        match value {
            serde_json::Value::Object(values) => Ok(Self::new(identifier, values, root)),
            other => Err(NodeError::invalid_config(
                identifier.to_string(),
                format!("expected a mapping, got {other}"),
            )),
        }
    }

    /// Returns the node this configuration belongs to.
    #[must_use]
    pub fn identifier(&self) -> &NodeIdentifier {
        &self.identifier
    }

    /// Returns the base path for resolving relative resources.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns all values, including `root`.
    #[must_use]
    pub fn values(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.values
    }

    /// Gets a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Gets a required value and deserializes it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the key is absent or has the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, NodeError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| NodeError::invalid_config(key, "missing"))?;
        T::deserialize(value).map_err(|e| NodeError::invalid_config(key, e.to_string()))
    }

    /// Gets an optional value, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the key is present with the wrong shape.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, NodeError> {
        match self.values.get(key) {
            None | Some(serde_json::Value::Null) => Ok(default),
            Some(_) => self.get_as(key),
        }
    }

    /// Gets a required string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if absent or not a string.
    pub fn get_str(&self, key: &str) -> Result<&str, NodeError> {
        self.values
            .get(key)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| NodeError::invalid_config(key, "expected a string"))
    }

    /// Returns the declared input keys from `input`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `input` is absent or not a list of strings.
    pub fn declared_inputs(&self) -> Result<Vec<String>, NodeError> {
        self.key_list(INPUT_KEY)
    }

    /// Returns the declared output keys from `output`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `output` is absent or not a list of strings.
    pub fn declared_outputs(&self) -> Result<Vec<String>, NodeError> {
        self.key_list(OUTPUT_KEY)
    }

    /// Deserializes the whole configuration into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the values do not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, NodeError> {
        serde_json::from_value(serde_json::Value::Object(self.values.clone()))
            .map_err(|e| NodeError::invalid_config(self.identifier.to_string(), e.to_string()))
    }

    /// Returns the configuration as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.values.clone())
    }

    fn key_list(&self, key: &str) -> Result<Vec<String>, NodeError> {
        let keys: Vec<String> = self.get_as(key)?;
        Ok(keys.into_iter().filter(|k| k != NONE_MARKER).collect())
    }
}
