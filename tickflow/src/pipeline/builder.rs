//! Assembling validated pipelines from node identifiers.

use super::executor::{Pipeline, PipelineNode};
use super::ContractEnforcement;
use crate::catalog::NodeCatalog;
use crate::config::{ConfigResolver, NodeEntry, PipelineOptions, RunConfig};
use crate::errors::PipelineError;
use crate::identifier::NodeIdentifier;
use tracing::info;

/// Builds pipelines from node identifiers.
///
/// For each node, in order, the builder resolves its config, resolves its
/// implementation and instantiates it. The resulting chain is validated
/// before anything is returned; no partial pipeline is ever produced.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    catalog: NodeCatalog,
    configs: ConfigResolver,
    initial_keys: Vec<String>,
    enforcement: ContractEnforcement,
}

impl PipelineBuilder {
    /// Creates a builder over a catalog and a config resolver.
    #[must_use]
    pub fn new(catalog: NodeCatalog, configs: ConfigResolver) -> Self {
        Self {
            catalog,
            configs,
            initial_keys: Vec::new(),
            enforcement: ContractEnforcement::default(),
        }
    }

    /// Creates a builder with the built-in catalog, wired from `options`.
    #[must_use]
    pub fn from_options(options: &PipelineOptions) -> Self {
        let catalog = NodeCatalog::with_builtins(&options.custom_dir);
        let configs = ConfigResolver::new(&options.builtin_root, &options.custom_dir)
            .with_overrides(options.overrides.clone());

        Self::new(catalog, configs)
            .with_initial_keys(options.initial_keys.iter().cloned())
            .with_enforcement(options.enforcement)
    }

    /// Sets the keys present before the first node runs.
    #[must_use]
    pub fn with_initial_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.initial_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the runtime enforcement mode.
    #[must_use]
    pub fn with_enforcement(mut self, enforcement: ContractEnforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &NodeCatalog {
        &self.catalog
    }

    /// Returns the catalog for registering more factories.
    pub fn catalog_mut(&mut self) -> &mut NodeCatalog {
        &mut self.catalog
    }

    /// Builds a pipeline running `identifiers` in the given order.
    ///
    /// # Errors
    ///
    /// Returns the first construction error encountered.
    pub fn build(&self, identifiers: &[NodeIdentifier]) -> Result<Pipeline, PipelineError> {
        let entries: Vec<NodeEntry> = identifiers.iter().cloned().map(NodeEntry::new).collect();
        self.build_entries(&entries)
    }

    /// Builds a pipeline from run config entries, applying their overrides.
    ///
    /// # Errors
    ///
    /// Returns the first construction error encountered.
    pub fn build_entries(&self, entries: &[NodeEntry]) -> Result<Pipeline, PipelineError> {
        self.assemble(entries, self.initial_keys.clone())
    }

    /// Builds the pipeline described by a run config.
    ///
    /// The run config's initial keys are added to the builder's.
    ///
    /// # Errors
    ///
    /// Returns the first construction error encountered.
    pub fn build_run_config(&self, run_config: &RunConfig) -> Result<Pipeline, PipelineError> {
        let mut initial_keys = self.initial_keys.clone();
        for key in &run_config.initial_keys {
            if !initial_keys.contains(key) {
                initial_keys.push(key.clone());
            }
        }
        self.assemble(&run_config.nodes, initial_keys)
    }

    fn assemble(&self, entries: &[NodeEntry], initial_keys: Vec<String>) -> Result<Pipeline, PipelineError> {
        if entries.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let mut nodes = Vec::with_capacity(entries.len());
        for entry in entries {
            let identifier = &entry.identifier;
            let config = self.configs.resolve_with(identifier, entry.overrides.as_ref())?;
            let handle = self.catalog.resolve(identifier)?;
            let node = handle.instantiate(config)?;

            info!("'{identifier}' added to pipeline");
            nodes.push(PipelineNode::new(identifier.to_string(), node));
        }

        Pipeline::assemble(nodes, initial_keys, self.enforcement)
    }
}
