//! `input.constant`: a source that emits the same values every tick.

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::frame::{NodeInputs, PIPELINE_END_KEY};
use crate::nodes::{Node, NodeContract, NodeOutput};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(default)]
    values: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    max_ticks: Option<u64>,
    #[serde(default)]
    interval_ms: u64,
}

/// Emits its configured `values` each tick and ends the run after
/// `max_ticks`.
#[derive(Debug)]
pub struct ConstantSource {
    contract: NodeContract,
    values: NodeOutput,
    max_ticks: Option<u64>,
    interval: Duration,
    ticks: u64,
}

impl ConstantSource {
    /// Creates the node from its config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a declared output has no value.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let contract = NodeContract::from_config(config)?;
        let settings: Settings = config.deserialize()?;

        if let Some(key) = contract.outputs.iter().find(|k| !settings.values.contains_key(*k)) {
            return Err(NodeError::invalid_config(
                "values",
                format!("declared output '{key}' has no value"),
            ));
        }

        Ok(Self {
            contract,
            values: settings.values.into_iter().collect(),
            max_ticks: settings.max_ticks,
            interval: Duration::from_millis(settings.interval_ms),
            ticks: 0,
        })
    }
}

impl Node for ConstantSource {
    fn name(&self) -> &str {
        &self.contract.name
    }

    fn inputs(&self) -> &[String] {
        &self.contract.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.contract.outputs
    }

    fn run(&mut self, _inputs: &NodeInputs<'_>) -> Result<NodeOutput, NodeError> {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.ticks += 1;

        let mut out = self.values.clone();
        if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            info!(node = %self.contract.name, ticks = self.ticks, "Reached max_ticks, ending pipeline");
            out.insert(PIPELINE_END_KEY.to_string(), serde_json::Value::Bool(true));
        }
        Ok(out)
    }
}
