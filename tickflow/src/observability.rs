//! Per-tick timing reports.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Measures elapsed wall time.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the timer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the timer and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Time one node spent in a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTiming {
    /// Position in the pipeline.
    pub index: usize,
    /// Node name.
    pub node: String,
    /// Duration in milliseconds.
    pub duration_ms: f64,
    /// Keys the node wrote, sorted.
    pub output_keys: Vec<String>,
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Timings of the nodes that completed, in order.
    pub nodes: Vec<NodeTiming>,
    /// Total tick duration in milliseconds.
    pub duration_ms: f64,
}

impl TickReport {
    /// Returns the slowest node, if any ran.
    #[must_use]
    pub fn slowest(&self) -> Option<&NodeTiming> {
        self.nodes
            .iter()
            .max_by(|a, b| a.duration_ms.total_cmp(&b.duration_ms))
    }

    /// Converts to a JSON payload for structured logs.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "duration_ms": self.duration_ms,
            "nodes": self.nodes,
        })
    }
}
