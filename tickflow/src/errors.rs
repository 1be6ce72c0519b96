//! Error types for tickflow.
//!
//! [`PipelineError`] covers everything that can go wrong while assembling a
//! pipeline or running a tick. [`NodeError`] is what individual node
//! implementations report; the pipeline wraps it with the node's identity and
//! position.

use crate::weights::WeightsError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pipeline construction and execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No configuration document exists for a node.
    #[error("No configuration for node '{identifier}' at {}", .path.display())]
    ConfigNotFound {
        /// The node identifier.
        identifier: String,
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A configuration document exists but could not be parsed.
    #[error("Malformed configuration for node '{identifier}' at {}: {message}", .path.display())]
    ConfigParse {
        /// The node identifier.
        identifier: String,
        /// The offending document.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Neither a built-in nor an external implementation exists.
    #[error("Node '{identifier}' not found (searched: {})", .searched.join(", "))]
    NodeNotFound {
        /// The node identifier.
        identifier: String,
        /// Locations that were searched.
        searched: Vec<String>,
    },

    /// A node failed to initialise.
    #[error("Failed to initialise node '{identifier}': {source}")]
    NodeInit {
        /// The node identifier.
        identifier: String,
        /// The underlying node error.
        #[source]
        source: NodeError,
    },

    /// The declared order does not form a satisfiable chain.
    #[error("{0}")]
    UnsatisfiedDependency(#[from] UnsatisfiedDependencyError),

    /// A node failed while running a tick.
    #[error("Node '{identifier}' at position {index} failed: {source}")]
    NodeExecution {
        /// Position of the node in the pipeline.
        index: usize,
        /// The node identifier.
        identifier: String,
        /// The underlying node error.
        #[source]
        source: NodeError,
    },

    /// The pipeline was given no nodes.
    #[error("Pipeline has no nodes")]
    EmptyPipeline,

    /// A node identifier could not be parsed.
    #[error("{0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// The declarative run config is invalid.
    #[error("Invalid run config at {}: {message}", .path.display())]
    RunConfig {
        /// The run config path.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// IO error while reading a document.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Creates a node init error.
    #[must_use]
    pub fn node_init(identifier: impl Into<String>, source: NodeError) -> Self {
        Self::NodeInit {
            identifier: identifier.into(),
            source,
        }
    }

    /// Creates a node execution error.
    #[must_use]
    pub fn node_execution(index: usize, identifier: impl Into<String>, source: NodeError) -> Self {
        Self::NodeExecution {
            index,
            identifier: identifier.into(),
            source,
        }
    }

    /// Creates an IO error for a path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors that abort pipeline assembly.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        !matches!(self, Self::NodeExecution { .. })
    }

    /// Returns a stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound { .. } => "TICKFLOW-CONFIG-NOT-FOUND",
            Self::ConfigParse { .. } => "TICKFLOW-CONFIG-PARSE",
            Self::NodeNotFound { .. } => "TICKFLOW-NODE-NOT-FOUND",
            Self::NodeInit { .. } => "TICKFLOW-NODE-INIT",
            Self::UnsatisfiedDependency(_) => "TICKFLOW-UNSATISFIED-DEPENDENCY",
            Self::NodeExecution { .. } => "TICKFLOW-NODE-EXECUTION",
            Self::EmptyPipeline => "TICKFLOW-EMPTY-PIPELINE",
            Self::InvalidIdentifier(_) => "TICKFLOW-INVALID-IDENTIFIER",
            Self::RunConfig { .. } => "TICKFLOW-RUN-CONFIG",
            Self::Io { .. } => "TICKFLOW-IO",
        }
    }

    /// Returns diagnostic info with a fix hint for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        let info = ContractErrorInfo::new(self.code(), self.to_string());
        match self {
            Self::ConfigNotFound { path, .. } => info
                .with_context_entry("path", path.display().to_string())
                .with_fix_hint("Create the node's config document, or check the namespace and name for typos."),
            Self::ConfigParse { path, .. } => info
                .with_context_entry("path", path.display().to_string())
                .with_fix_hint("Node configs must be YAML mappings."),
            Self::NodeNotFound { .. } => info.with_fix_hint(
                "Use `tickflow nodes` to list built-in nodes; custom nodes are `custom.<name>` with a `<name>.rhai` script.",
            ),
            Self::UnsatisfiedDependency(err) => err.error_info.clone(),
            Self::NodeExecution { index, .. } => {
                info.with_context_entry("index", index.to_string())
            }
            Self::EmptyPipeline => {
                info.with_fix_hint("List at least one node under `nodes:` in the run config.")
            }
            _ => info,
        }
    }
}

/// Metadata about an error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "TICKFLOW-UNSATISFIED-DEPENDENCY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }

        map
    }
}

/// Raised when a node's declared inputs are not produced upstream.
#[derive(Debug, Clone, Error)]
#[error(
    "Nodes in this pipeline do not form a proper chain: '{node}' at position {index} requires {missing:?}, \
     but only {available:?} are available. Nodes run sequentially, in the declared order."
)]
pub struct UnsatisfiedDependencyError {
    /// Position of the first offending node.
    pub index: usize,
    /// Identifier of the offending node.
    pub node: String,
    /// Required keys not yet available, sorted.
    pub missing: Vec<String>,
    /// Keys available at that point, sorted.
    pub available: Vec<String>,
    /// Diagnostic info.
    pub error_info: ContractErrorInfo,
}

impl UnsatisfiedDependencyError {
    /// Creates a new unsatisfied dependency error.
    #[must_use]
    pub fn new(
        index: usize,
        node: impl Into<String>,
        missing: Vec<String>,
        available: Vec<String>,
    ) -> Self {
        let node = node.into();
        let error_info = ContractErrorInfo::new(
            "TICKFLOW-UNSATISFIED-DEPENDENCY",
            format!("Node '{node}' requires keys no earlier node produces: {}", missing.join(", ")),
        )
        .with_fix_hint(
            "Move a node producing the missing keys before this one, or declare them as initial keys.",
        )
        .with_context_entry("index", index.to_string())
        .with_context_entry("node", node.clone());

        Self {
            index,
            node,
            missing,
            available,
            error_info,
        }
    }
}

/// Raised when a node identifier cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid node identifier '{value}': {reason}")]
pub struct IdentifierError {
    /// The rejected input.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl IdentifierError {
    /// Creates a new identifier error.
    #[must_use]
    pub fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by node implementations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A required input is absent from the frame.
    #[error("required input '{key}' is missing from the frame")]
    MissingInput {
        /// The missing key.
        key: String,
    },

    /// A node read a key it did not declare (strict enforcement only).
    #[error("node '{node}' read '{key}', which is not a declared input")]
    UndeclaredInput {
        /// The reading node.
        node: String,
        /// The undeclared key.
        key: String,
    },

    /// An input value has the wrong shape.
    #[error("input '{key}' is malformed: {message}")]
    InvalidInput {
        /// The offending key.
        key: String,
        /// What was wrong.
        message: String,
    },

    /// A configuration value is missing or has the wrong shape.
    #[error("invalid config value for '{key}': {message}")]
    InvalidConfig {
        /// The offending config key.
        key: String,
        /// What was wrong.
        message: String,
    },

    /// A declared output was not produced, or (strict enforcement) an
    /// undeclared one was.
    #[error("contract violation: missing outputs {missing:?}, undeclared outputs {undeclared:?}")]
    ContractViolation {
        /// Declared outputs that were not produced.
        missing: Vec<String>,
        /// Produced outputs that were not declared.
        undeclared: Vec<String>,
    },

    /// Weights provisioning failed.
    #[error("{0}")]
    Weights(#[from] WeightsError),

    /// An external script failed to compile or run.
    #[error("script error: {0}")]
    Script(String),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl NodeError {
    /// Creates a generic failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Creates a missing-input error.
    #[must_use]
    pub fn missing_input(key: impl Into<String>) -> Self {
        Self::MissingInput { key: key.into() }
    }

    /// Creates an invalid-input error.
    #[must_use]
    pub fn invalid_input(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-config error.
    #[must_use]
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }
}
