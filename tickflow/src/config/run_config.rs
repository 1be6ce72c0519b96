//! The declarative run config listing which nodes to run, in order.

use crate::errors::{IdentifierError, PipelineError};
use crate::identifier::NodeIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default run config file name.
pub const RUN_CONFIG_FILE: &str = "run_config.yml";

/// One entry of the `nodes:` list.
///
/// Written either as `"<namespace>.<name>"` or as a single-key mapping
/// `{"<namespace>.<name>": {key: value}}` carrying config overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub struct NodeEntry {
    /// The node to run.
    pub identifier: NodeIdentifier,
    /// Overrides applied on top of the node's config document.
    pub overrides: Option<serde_json::Map<String, serde_json::Value>>,
}

impl NodeEntry {
    /// Creates an entry without overrides.
    #[must_use]
    pub fn new(identifier: NodeIdentifier) -> Self {
        Self {
            identifier,
            overrides: None,
        }
    }

    /// Sets the overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: serde_json::Map<String, serde_json::Value>) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

impl From<NodeIdentifier> for NodeEntry {
    fn from(identifier: NodeIdentifier) -> Self {
        Self::new(identifier)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Plain(String),
    Configured(BTreeMap<String, serde_json::Map<String, serde_json::Value>>),
}

impl TryFrom<RawEntry> for NodeEntry {
    type Error = IdentifierError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        match raw {
            RawEntry::Plain(s) => Ok(Self::new(NodeIdentifier::parse(&s)?)),
            RawEntry::Configured(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((id, overrides)), None) => {
                        Ok(Self::new(NodeIdentifier::parse(&id)?).with_overrides(overrides))
                    }
                    _ => Err(IdentifierError::new(
                        "<mapping>",
                        "a configured node entry must have exactly one key",
                    )),
                }
            }
        }
    }
}

impl From<NodeEntry> for RawEntry {
    fn from(entry: NodeEntry) -> Self {
        match entry.overrides {
            None => Self::Plain(entry.identifier.to_string()),
            Some(overrides) => {
                Self::Configured(BTreeMap::from([(entry.identifier.to_string(), overrides)]))
            }
        }
    }
}

/// The parsed run config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Nodes in execution order.
    pub nodes: Vec<NodeEntry>,
    /// Frame keys guaranteed present before the first node runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_keys: Vec<String>,
}

impl RunConfig {
    /// Creates a run config from identifiers.
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = NodeIdentifier>) -> Self {
        Self {
            nodes: nodes.into_iter().map(NodeEntry::new).collect(),
            initial_keys: Vec::new(),
        }
    }

    /// The template written by `tickflow init`.
    #[must_use]
    pub fn default_config() -> Self {
        let nodes = ["input.constant", "dabble.bbox_count", "dabble.fps", "output.log"]
            .into_iter()
            .filter_map(|s| NodeIdentifier::parse(s).ok());
        Self::new(nodes)
    }

    /// Reads a run config from disk.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `RunConfig` if it is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config = Self::from_yaml_str(&contents, path)?;
        info!(path = %path.display(), nodes = config.nodes.len(), "Successfully loaded run_config file.");
        Ok(config)
    }

    /// Parses a run config. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns `RunConfig` if the YAML is malformed or has no `nodes` list.
    pub fn from_yaml_str(contents: &str, origin: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        serde_yaml::from_str(contents).map_err(|e| PipelineError::RunConfig {
            path: origin.into(),
            message: e.to_string(),
        })
    }

    /// Serializes to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Returns the identifiers in order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<NodeIdentifier> {
        self.nodes.iter().map(|e| e.identifier.clone()).collect()
    }
}
