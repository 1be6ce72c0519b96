//! `dabble.fps`: ticks per second over a moving window.

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::frame::NodeInputs;
use crate::nodes::{Node, NodeContract, NodeOutput};
use serde_json::json;
use std::collections::VecDeque;
use std::time::Instant;

const FPS: &str = "fps";
const DEFAULT_WINDOW: usize = 10;

/// Emits `fps`, the tick rate averaged over the last `window` ticks.
///
/// The first tick reports 0.
#[derive(Debug)]
pub struct Fps {
    contract: NodeContract,
    window: usize,
    stamps: VecDeque<Instant>,
}

impl Fps {
    /// Creates the node from its config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `window` is below 2.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let window: usize = config.get_or("window", DEFAULT_WINDOW)?;
        if window < 2 {
            return Err(NodeError::invalid_config("window", "must be at least 2"));
        }

        Ok(Self {
            contract: NodeContract::from_config(config)?,
            window,
            stamps: VecDeque::with_capacity(window),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn record(&mut self, now: Instant) -> f64 {
        if self.stamps.len() == self.window {
            self.stamps.pop_front();
        }
        self.stamps.push_back(now);

        match (self.stamps.front(), self.stamps.back()) {
            (Some(first), Some(last)) if self.stamps.len() > 1 => {
                let elapsed = last.duration_since(*first).as_secs_f64();
                if elapsed > 0.0 {
                    (self.stamps.len() - 1) as f64 / elapsed
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

impl Node for Fps {
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
        let fps = self.record(Instant::now());
        Ok(NodeOutput::from([(FPS.to_string(), json!(fps))]))
    }
}
