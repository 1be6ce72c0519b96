//! The node trait and built-in node implementations.
//!
//! Nodes are the pluggable stages of a pipeline. Each declares the frame keys
//! it reads and writes, and is run once per tick.

pub mod builtin;

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::frame::NodeInputs;
use std::collections::HashMap;
use std::fmt::Debug;

/// Values a node produces for one tick, merged into the frame.
pub type NodeOutput = HashMap<String, serde_json::Value>;

/// Trait for pipeline nodes.
///
/// A node is created once when the pipeline is built and lives as long as the
/// pipeline. It may keep state between ticks.
pub trait Node: Send + Debug {
    /// Returns the node's name, normally its identifier.
    fn name(&self) -> &str;

    /// Frame keys this node requires.
    fn inputs(&self) -> &[String];

    /// Frame keys this node produces.
    fn outputs(&self) -> &[String];

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn run(&mut self, inputs: &NodeInputs<'_>) -> Result<NodeOutput, NodeError>;
}

/// The declared name, inputs and outputs of a node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeContract {
    /// Node name.
    pub name: String,
    /// Required frame keys.
    pub inputs: Vec<String>,
    /// Produced frame keys.
    pub outputs: Vec<String>,
}

impl NodeContract {
    /// Creates a contract.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = impl Into<String>>,
        outputs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads the contract from a config's `input` and `output` lists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if either list is missing or malformed.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        Ok(Self {
            name: config.identifier().to_string(),
            inputs: config.declared_inputs()?,
            outputs: config.declared_outputs()?,
        })
    }
}

/// A closure-based node.
pub struct FnNode<F>
where
    F: FnMut(&NodeInputs<'_>) -> Result<NodeOutput, NodeError> + Send,
{
    contract: NodeContract,
    func: F,
}

impl<F> FnNode<F>
where
    F: FnMut(&NodeInputs<'_>) -> Result<NodeOutput, NodeError> + Send,
{
    /// Creates a new closure-based node.
    pub fn new(contract: NodeContract, func: F) -> Self {
        Self { contract, func }
    }
}

impl<F> Debug for FnNode<F>
where
    F: FnMut(&NodeInputs<'_>) -> Result<NodeOutput, NodeError> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnNode")
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

impl<F> Node for FnNode<F>
where
    F: FnMut(&NodeInputs<'_>) -> Result<NodeOutput, NodeError> + Send,
{
    fn name(&self) -> &str {
        &self.contract.name
    }

    fn inputs(&self) -> &[String] {
        &self.contract.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.contract.outputs
    }

    fn run(&mut self, inputs: &NodeInputs<'_>) -> Result<NodeOutput, NodeError> {
        (self.func)(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DataFrame;
    use crate::identifier::NodeIdentifier;
    use serde_json::json;

    #[test]
    fn test_fn_node() {
        let mut calls = 0;
        let mut node = FnNode::new(
            NodeContract::new("dabble.double", ["x"], ["y"]),
            move |inputs: &NodeInputs<'_>| {
                calls += 1;
                let x = inputs.require_as::<i64>("x")?;
                Ok(NodeOutput::from([("y".to_string(), json!(x * 2 + calls - 1))]))
            },
        );

        assert_eq!(node.name(), "dabble.double");
        assert_eq!(node.inputs(), ["x".to_string()]);

        let frame = DataFrame::new().with("x", json!(21));
        let out = node.run(&NodeInputs::permissive(&frame, "dabble.double")).unwrap();
        assert_eq!(out.get("y"), Some(&json!(42)));
    }

    #[test]
    fn test_contract_from_config() {
        let cfg = NodeConfig::from_json(
            NodeIdentifier::parse("output.log").unwrap(),
            json!({"input": ["count", "fps"], "output": ["none"]}),
            "/",
        )
        .unwrap();

        let contract = NodeContract::from_config(&cfg).unwrap();
        assert_eq!(contract.name, "output.log");
        assert_eq!(contract.inputs, vec!["count".to_string(), "fps".to_string()]);
        assert!(contract.outputs.is_empty());
    }
}
