//! User overrides merged over node config defaults.

use crate::identifier::NodeIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Per-node overrides, keyed by `"<namespace>.<name>"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigOverrides {
    by_node: BTreeMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl ConfigOverrides {
    /// Creates an empty override table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON string such as `{"dabble.fps": {"window": 5}}`.
    ///
    /// Blank input and the literal `None` mean no overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a mapping of mappings.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "None" {
            return Ok(Self::default());
        }
        serde_json::from_str(trimmed)
    }

    /// Sets the overrides for one node.
    #[must_use]
    pub fn with_node(
        mut self,
        identifier: &NodeIdentifier,
        values: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.by_node.insert(identifier.to_string(), values);
        self
    }

    /// Returns the overrides for one node.
    #[must_use]
    pub fn get(&self, identifier: &NodeIdentifier) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.by_node.get(&identifier.to_string())
    }

    /// Returns true if there are no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    /// Returns the node identifiers that have overrides.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.by_node.keys().map(String::as_str)
    }
}

/// Merges `update` into `target`.
///
/// Nested mappings merge recursively. A scalar for a key that the defaults do
/// not define is ignored with a warning; a scalar for a known key replaces it.
pub fn apply_overrides(
    target: &mut serde_json::Map<String, serde_json::Value>,
    update: &serde_json::Map<String, serde_json::Value>,
    node: &str,
) {
    for (key, value) in update {
        if let serde_json::Value::Object(nested) = value {
            let slot = target
                .entry(key.clone())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if !slot.is_object() {
                *slot = serde_json::Value::Object(serde_json::Map::new());
            }
            if let serde_json::Value::Object(inner) = slot {
                apply_overrides(inner, nested, node);
            }
        } else if let Some(slot) = target.get_mut(key) {
            *slot = value.clone();
            info!(node = %node, key = %key, value = %value, "Config for node {} is updated to: '{}': {}", node, key, value);
        } else {
            warn!(node = %node, key = %key, "Config for node {} does not have the key: {}", node, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn as_map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_replace_known_key() {
        let mut target = as_map(json!({"window": 10, "input": ["none"]}));
        apply_overrides(&mut target, &as_map(json!({"window": 3})), "dabble.fps");

        assert_eq!(target.get("window"), Some(&json!(3)));
    }

    #[test]
    fn test_unknown_scalar_ignored() {
        let mut target = as_map(json!({"window": 10}));
        apply_overrides(&mut target, &as_map(json!({"windw": 3})), "dabble.fps");

        assert_eq!(serde_json::Value::Object(target), json!({"window": 10}));
    }

    #[test]
    fn test_nested_merge() {
        let mut target = as_map(json!({"weights": {"url": "http://a", "files": ["m.bin"]}}));
        apply_overrides(
            &mut target,
            &as_map(json!({"weights": {"url": "http://b"}, "values": {"image": 1}})),
            "model.x",
        );

        assert_eq!(
            serde_json::Value::Object(target),
            json!({
                "weights": {"url": "http://b", "files": ["m.bin"]},
                "values": {}
            })
        );
    }

    #[test]
    fn test_parse_overrides() {
        let overrides = ConfigOverrides::from_json_str(r#"{"dabble.fps": {"window": 5}}"#).unwrap();
        let id = NodeIdentifier::parse("dabble.fps").unwrap();

        assert_eq!(overrides.get(&id).unwrap().get("window"), Some(&json!(5)));
        assert!(ConfigOverrides::from_json_str("None").unwrap().is_empty());
        assert!(ConfigOverrides::from_json_str("   ").unwrap().is_empty());
        assert!(ConfigOverrides::from_json_str("[1]").is_err());
    }
}
