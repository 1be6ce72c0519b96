//! Mock nodes for testing.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::NodeError;
use crate::frame::{DataFrame, NodeInputs};
use crate::nodes::{Node, NodeOutput};

/// Shared log of node names, in call order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn to_strings(keys: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    keys.into_iter().map(Into::into).collect()
}

/// A node that always returns the same values.
#[derive(Debug, Clone)]
pub struct StaticNode {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    values: NodeOutput,
}

impl StaticNode {
    /// Creates a node emitting `values`; its declared outputs are their keys.
    #[must_use]
    pub fn new<K: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = (K, serde_json::Value)>,
    ) -> Self {
        let values: NodeOutput = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut outputs: Vec<String> = values.keys().cloned().collect();
        outputs.sort();
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs,
            values,
        }
    }

    /// Sets the declared inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inputs = to_strings(inputs);
        self
    }

    /// Overrides the declared outputs.
    #[must_use]
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.outputs = to_strings(outputs);
        self
    }
}

impl Node for StaticNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn run(&mut self, _inputs: &NodeInputs<'_>) -> Result<NodeOutput, NodeError> {
        Ok(self.values.clone())
    }
}

/// A node that records what it saw on every call.
///
/// Each call appends the visible part of the frame to [`RecordingNode::calls`]
/// and the node's name to the shared call log, if one is set. Declared outputs
/// are emitted with the node's name as their value.
#[derive(Debug)]
pub struct RecordingNode {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    reads: Vec<String>,
    calls: Arc<Mutex<Vec<DataFrame>>>,
    log: Option<CallLog>,
}

impl RecordingNode {
    /// Creates a recording node with no declared keys.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            reads: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            log: None,
        }
    }

    /// Sets the declared inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inputs = to_strings(inputs);
        self
    }

    /// Sets the declared outputs.
    #[must_use]
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.outputs = to_strings(outputs);
        self
    }

    /// Additional keys read on every call, declared or not.
    #[must_use]
    pub fn reading(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.reads = to_strings(keys);
        self
    }

    /// Appends this node's name to `log` on every call.
    #[must_use]
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Returns a handle to the recorded frames.
    #[must_use]
    pub fn calls(&self) -> Arc<Mutex<Vec<DataFrame>>> {
        Arc::clone(&self.calls)
    }
}

impl Node for RecordingNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn run(&mut self, inputs: &NodeInputs<'_>) -> Result<NodeOutput, NodeError> {
        let mut seen: DataFrame = inputs
            .visible()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        for key in &self.reads {
            if let Some(value) = inputs.get(key)? {
                seen.insert(key.clone(), value.clone());
            }
        }

        self.calls.lock().push(seen);
        if let Some(log) = &self.log {
            log.lock().push(self.name.clone());
        }

        Ok(self
            .outputs
            .iter()
            .map(|key| (key.clone(), serde_json::json!(self.name)))
            .collect())
    }
}

/// A node that fails on selected calls.
#[derive(Debug)]
pub struct FailingNode {
    name: String,
    message: String,
    fail_on: Option<HashSet<u64>>,
    calls: u64,
}

impl FailingNode {
    /// Creates a node that fails on every call.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            message: format!("{name} failed"),
            name,
            fail_on: None,
            calls: 0,
        }
    }

    /// Fails only on the given calls, counted from 1.
    #[must_use]
    pub fn failing_on(mut self, calls: impl IntoIterator<Item = u64>) -> Self {
        self.fail_on = Some(calls.into_iter().collect());
        self
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl Node for FailingNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &[String] {
        &[]
    }

    fn outputs(&self) -> &[String] {
        &[]
    }

    fn run(&mut self, _inputs: &NodeInputs<'_>) -> Result<NodeOutput, NodeError> {
        self.calls += 1;
        let fails = self.fail_on.as_ref().map_or(true, |set| set.contains(&self.calls));
        if fails {
            Err(NodeError::failed(self.message.clone()))
        } else {
            Ok(NodeOutput::new())
        }
    }
}
