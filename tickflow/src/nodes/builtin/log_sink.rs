//! `output.log`: writes its inputs to the log every tick.

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::frame::NodeInputs;
use crate::nodes::{Node, NodeContract, NodeOutput};
use tracing::{debug, error, info, trace, warn, Level};

/// Logs the values of its declared inputs as one line per tick.
#[derive(Debug)]
pub struct LogSink {
    contract: NodeContract,
    level: Level,
}

impl LogSink {
    /// Creates the node from its config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unknown `level`.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let level: String = config.get_or("level", "info".to_string())?;
        let level = level
            .parse::<Level>()
            .map_err(|e| NodeError::invalid_config("level", e.to_string()))?;

        Ok(Self {
            contract: NodeContract::from_config(config)?,
            level,
        })
    }

    fn render(&self, inputs: &NodeInputs<'_>) -> Result<String, NodeError> {
        let mut parts = Vec::with_capacity(self.contract.inputs.len());
        for key in &self.contract.inputs {
            let value = inputs.require(key)?;
            parts.push(format!("{key}={value}"));
        }
        Ok(parts.join(" "))
    }
}

impl Node for LogSink {
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
        let line = self.render(inputs)?;
        let node = self.contract.name.as_str();
        match self.level {
            Level::TRACE => trace!(node = %node, "{line}"),
            Level::DEBUG => debug!(node = %node, "{line}"),
            Level::INFO => info!(node = %node, "{line}"),
            Level::WARN => warn!(node = %node, "{line}"),
            _ => error!(node = %node, "{line}"),
        }
        Ok(NodeOutput::new())
    }
}
