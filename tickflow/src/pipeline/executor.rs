//! The validated, immutable node sequence and its per-tick loop.

use super::validation::{validate_chain, ChainLink};
use super::ContractEnforcement;
use crate::errors::PipelineError;
use crate::frame::{DataFrame, NodeInputs};
use crate::nodes::Node;
use crate::observability::{NodeTiming, SpanTimer, TickReport};
use std::collections::BTreeSet;
use tracing::debug;

/// A node together with the name and contract it was validated under.
#[derive(Debug)]
pub struct PipelineNode {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    node: Box<dyn Node>,
}

impl PipelineNode {
    /// Wraps a node under an explicit name, usually its identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, node: Box<dyn Node>) -> Self {
        Self {
            name: name.into(),
            inputs: node.inputs().to_vec(),
            outputs: node.outputs().to_vec(),
            node,
        }
    }

    /// Returns the node's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared inputs.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Returns the declared outputs.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn link(&self) -> ChainLink<'_> {
        ChainLink::new(&self.name, &self.inputs, &self.outputs)
    }
}

impl From<Box<dyn Node>> for PipelineNode {
    fn from(node: Box<dyn Node>) -> Self {
        let name = node.name().to_string();
        Self::new(name, node)
    }
}

/// An ordered, validated sequence of nodes.
///
/// Every node's inputs are covered by the initial keys and the outputs of the
/// nodes before it. Nodes cannot be added or removed after assembly.
#[derive(Debug)]
pub struct Pipeline {
    nodes: Vec<PipelineNode>,
    initial_keys: Vec<String>,
    enforcement: ContractEnforcement,
}

impl Pipeline {
    /// Validates `nodes` in the given order and wraps them.
    ///
    /// # Errors
    ///
    /// Returns `EmptyPipeline` for an empty sequence and
    /// `UnsatisfiedDependency` for the first node whose inputs are unavailable.
    pub fn assemble(
        nodes: Vec<PipelineNode>,
        initial_keys: Vec<String>,
        enforcement: ContractEnforcement,
    ) -> Result<Self, PipelineError> {
        if nodes.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        validate_chain(nodes.iter().map(PipelineNode::link), &initial_keys)?;

        Ok(Self {
            nodes,
            initial_keys,
            enforcement,
        })
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for an assembled pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns node names in execution order.
    #[must_use]
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(PipelineNode::name).collect()
    }

    /// Returns the nodes in execution order.
    #[must_use]
    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    /// Returns the initial keys the pipeline was validated against.
    #[must_use]
    pub fn initial_keys(&self) -> &[String] {
        &self.initial_keys
    }

    /// Returns the enforcement mode.
    #[must_use]
    pub fn enforcement(&self) -> ContractEnforcement {
        self.enforcement
    }

    /// Returns every key a tick can produce, sorted.
    #[must_use]
    pub fn produced_keys(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .initial_keys
            .iter()
            .chain(self.nodes.iter().flat_map(|n| n.outputs.iter()))
            .collect();
        keys.into_iter().cloned().collect()
    }

    /// Runs every node once, in order, threading `frame` through them.
    ///
    /// # Errors
    ///
    /// Returns `NodeExecution` for the first node that fails. The rest of the
    /// tick is skipped; the pipeline can run the next tick.
    pub fn run_tick(&mut self, frame: DataFrame) -> Result<DataFrame, PipelineError> {
        self.run_tick_with_report(frame).map(|(frame, _)| frame)
    }

    /// Like [`Pipeline::run_tick`], also returning per-node timings.
    ///
    /// # Errors
    ///
    /// Returns `NodeExecution` for the first node that fails.
    pub fn run_tick_with_report(
        &mut self,
        mut frame: DataFrame,
    ) -> Result<(DataFrame, TickReport), PipelineError> {
        let tick_timer = SpanTimer::start("tick");
        let enforcement = self.enforcement;
        let strict = enforcement.restricts_inputs();
        let mut report = TickReport::default();

        for (index, entry) in self.nodes.iter_mut().enumerate() {
            let timer = SpanTimer::start(entry.name.as_str());

            let inputs = NodeInputs::new(&frame, &entry.inputs, &entry.name, strict);
            let outputs = entry
                .node
                .run(&inputs)
                .and_then(|outputs| {
                    enforcement.check_outputs(&entry.name, &entry.outputs, &outputs)?;
                    Ok(outputs)
                })
                .map_err(|e| PipelineError::node_execution(index, entry.name.clone(), e))?;

            let mut output_keys: Vec<String> = outputs.keys().cloned().collect();
            output_keys.sort();
            frame.merge(outputs);

            let duration_ms = timer.finish();
            debug!(node = %entry.name, index, duration_ms, "Node completed");
            report.nodes.push(NodeTiming {
                index,
                node: entry.name.clone(),
                duration_ms,
                output_keys,
            });
        }

        report.duration_ms = tick_timer.finish();
        Ok((frame, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NodeError;
    use crate::testing::{FailingNode, RecordingNode, StaticNode};
    use serde_json::json;

    fn boxed(node: impl Node + 'static) -> PipelineNode {
        PipelineNode::from(Box::new(node) as Box<dyn Node>)
    }

    #[test]
    fn test_assemble_rejects_empty() {
        let err = Pipeline::assemble(vec![], vec![], ContractEnforcement::Off).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyPipeline));
    }

    #[test]
    fn test_run_tick_merges_outputs() {
        let mut pipeline = Pipeline::assemble(
            vec![
                boxed(StaticNode::new("a", [("x", json!(1))])),
                boxed(StaticNode::new("b", [("x", json!(2)), ("y", json!(3))]).with_inputs(["x"])),
            ],
            vec![],
            ContractEnforcement::Off,
        )
        .unwrap();

        let frame = pipeline.run_tick(DataFrame::new()).unwrap();
        assert_eq!(frame.get("x"), Some(&json!(2)));
        assert_eq!(frame.get("y"), Some(&json!(3)));
        assert_eq!(pipeline.produced_keys(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_failure_aborts_tick_only() {
        let recorder = RecordingNode::new("after").with_inputs(["x"]);
        let calls = recorder.calls();
        let mut pipeline = Pipeline::assemble(
            vec![
                boxed(StaticNode::new("a", [("x", json!(1))])),
                boxed(FailingNode::new("flaky").failing_on([1])),
                boxed(recorder),
            ],
            vec![],
            ContractEnforcement::Off,
        )
        .unwrap();

        let err = pipeline.run_tick(DataFrame::new()).unwrap_err();
        match err {
            PipelineError::NodeExecution { index, identifier, .. } => {
                assert_eq!(index, 1);
                assert_eq!(identifier, "flaky");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.lock().len(), 0);

        assert!(pipeline.run_tick(DataFrame::new()).is_ok());
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn test_missing_declared_output_names_producer() {
        let producer = StaticNode::new("producer", [("x", json!(1))]).with_outputs(["x", "y"]);
        let consumer = RecordingNode::new("consumer").with_inputs(["y"]).with_outputs(["z"]);
        let calls = consumer.calls();
        let mut pipeline = Pipeline::assemble(
            vec![boxed(producer), boxed(consumer)],
            vec![],
            ContractEnforcement::default(),
        )
        .unwrap();

        match pipeline.run_tick(DataFrame::new()).unwrap_err() {
            PipelineError::NodeExecution {
                index,
                identifier,
                source: NodeError::ContractViolation { missing, .. },
            } => {
                assert_eq!(index, 0);
                assert_eq!(identifier, "producer");
                assert_eq!(missing, vec!["y".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_strict_rejects_undeclared_output() {
        let node = StaticNode::new("a", [("x", json!(1)), ("extra", json!(true))]).with_outputs(["x"]);
        let mut pipeline =
            Pipeline::assemble(vec![boxed(node)], vec![], ContractEnforcement::Strict).unwrap();

        let err = pipeline.run_tick(DataFrame::new()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NodeExecution {
                source: NodeError::ContractViolation { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_strict_rejects_undeclared_read() {
        let reader = RecordingNode::new("reader").reading(["secret"]);
        let mut pipeline = Pipeline::assemble(
            vec![boxed(StaticNode::new("a", [("secret", json!(1))])), boxed(reader)],
            vec![],
            ContractEnforcement::Strict,
        )
        .unwrap();

        let err = pipeline.run_tick(DataFrame::new()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NodeExecution {
                index: 1,
                source: NodeError::UndeclaredInput { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_report_has_one_timing_per_node() {
        let mut pipeline = Pipeline::assemble(
            vec![
                boxed(StaticNode::new("a", [("x", json!(1))])),
                boxed(RecordingNode::new("b").with_inputs(["x"])),
            ],
            vec![],
            ContractEnforcement::Warn,
        )
        .unwrap();

        let (_, report) = pipeline.run_tick_with_report(DataFrame::new()).unwrap();
        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.nodes[0].output_keys, vec!["x".to_string()]);
        assert_eq!(report.nodes[1].node, "b");
    }
}
