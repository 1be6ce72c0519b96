//! `dabble.bbox_count`: counts detected bounding boxes.

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::frame::NodeInputs;
use crate::nodes::{Node, NodeContract, NodeOutput};
use serde_json::json;

const BBOXES: &str = "bboxes";
const COUNT: &str = "count";

/// Emits `count`, the number of entries in `bboxes`.
#[derive(Debug)]
pub struct BboxCount {
    contract: NodeContract,
}

impl BboxCount {
    /// Creates the node from its config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the contract is malformed.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        Ok(Self {
            contract: NodeContract::from_config(config)?,
        })
    }
}

impl Node for BboxCount {
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
        let count = inputs
            .require(BBOXES)?
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| NodeError::invalid_input(BBOXES, "expected a list of boxes"))?;

        Ok(NodeOutput::from([(COUNT.to_string(), json!(count))]))
    }
}
