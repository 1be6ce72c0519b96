//! Resolving node identifiers to implementations.
//!
//! Built-in nodes are registered as factories at startup. Identifiers in the
//! `custom` namespace resolve to Rhai scripts in the custom nodes directory.

mod script;

pub use script::{ScriptImplementation, ScriptNode, SCRIPT_EXTENSION};

use crate::config::NodeConfig;
use crate::errors::{NodeError, PipelineError};
use crate::identifier::NodeIdentifier;
use crate::nodes::{builtin, Node};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Creates a node from its configuration.
pub type NodeFactory = Arc<dyn Fn(NodeConfig) -> Result<Box<dyn Node>, NodeError> + Send + Sync>;

/// A loadable node implementation.
#[derive(Clone)]
pub enum ImplementationHandle {
    /// A registered factory.
    Builtin {
        /// The node identifier.
        identifier: NodeIdentifier,
        /// The factory.
        factory: NodeFactory,
    },
    /// A compiled script.
    Script(ScriptImplementation),
}

impl ImplementationHandle {
    /// Returns the node identifier.
    #[must_use]
    pub fn identifier(&self) -> &NodeIdentifier {
        match self {
            Self::Builtin { identifier, .. } => identifier,
            Self::Script(script) => script.identifier(),
        }
    }

    /// Returns true for registered factories.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }

    /// Creates a node instance. All initialisation happens before this returns.
    ///
    /// # Errors
    ///
    /// Returns `NodeInit` wrapping whatever the implementation reported.
    pub fn instantiate(&self, config: NodeConfig) -> Result<Box<dyn Node>, PipelineError> {
        let node = match self {
            Self::Builtin { factory, .. } => factory(config),
            Self::Script(script) => script
                .instantiate(&config)
                .map(|node| Box::new(node) as Box<dyn Node>),
        };
        node.map_err(|e| PipelineError::node_init(self.identifier().to_string(), e))
    }
}

impl fmt::Debug for ImplementationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin { identifier, .. } => f
                .debug_struct("Builtin")
                .field("identifier", identifier)
                .finish_non_exhaustive(),
            Self::Script(script) => f
                .debug_struct("Script")
                .field("identifier", script.identifier())
                .field("path", &script.path())
                .finish(),
        }
    }
}

/// Maps node identifiers to implementations.
#[derive(Clone)]
pub struct NodeCatalog {
    factories: HashMap<NodeIdentifier, NodeFactory>,
    custom_dir: PathBuf,
}

impl NodeCatalog {
    /// Creates an empty catalog reading scripts from `custom_dir`.
    #[must_use]
    pub fn new(custom_dir: impl Into<PathBuf>) -> Self {
        Self {
            factories: HashMap::new(),
            custom_dir: custom_dir.into(),
        }
    }

    /// Creates a catalog with every built-in node registered.
    #[must_use]
    pub fn with_builtins(custom_dir: impl Into<PathBuf>) -> Self {
        let mut catalog = Self::new(custom_dir);
        builtin::register_all(&mut catalog);
        catalog
    }

    /// Registers a factory, replacing any previous one for `identifier`.
    pub fn register<F>(&mut self, identifier: NodeIdentifier, factory: F)
    where
        F: Fn(NodeConfig) -> Result<Box<dyn Node>, NodeError> + Send + Sync + 'static,
    {
        self.factories.insert(identifier, Arc::new(factory));
    }

    /// Returns true if a factory is registered for `identifier`.
    #[must_use]
    pub fn contains(&self, identifier: &NodeIdentifier) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Returns registered identifiers, sorted.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&NodeIdentifier> {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        ids
    }

    /// Returns the custom nodes directory.
    #[must_use]
    pub fn custom_dir(&self) -> &Path {
        &self.custom_dir
    }

    /// Returns where the script for a custom node lives.
    #[must_use]
    pub fn script_path(&self, identifier: &NodeIdentifier) -> PathBuf {
        self.custom_dir
            .join(format!("{}.{SCRIPT_EXTENSION}", identifier.name()))
    }

    /// Resolves `identifier` to an implementation.
    ///
    /// Registered factories win. Otherwise `custom.<name>` loads
    /// `<custom_dir>/<name>.rhai`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` listing what was searched, `NodeInit` if a script
    /// does not compile, or `Io` if it cannot be read.
    pub fn resolve(&self, identifier: &NodeIdentifier) -> Result<ImplementationHandle, PipelineError> {
        if let Some(factory) = self.factories.get(identifier) {
            return Ok(ImplementationHandle::Builtin {
                identifier: identifier.clone(),
                factory: Arc::clone(factory),
            });
        }

        let mut searched = vec!["built-in catalog".to_string()];
        if identifier.is_custom() {
            let path = self.script_path(identifier);
            if path.is_file() {
                return ScriptImplementation::load(identifier, &path).map(ImplementationHandle::Script);
            }
            searched.push(path.display().to_string());
        }

        Err(PipelineError::NodeNotFound {
            identifier: identifier.to_string(),
            searched,
        })
    }
}

impl fmt::Debug for NodeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCatalog")
            .field("factories", &self.identifiers())
            .field("custom_dir", &self.custom_dir)
            .finish()
    }
}
