//! End-to-end tests: configs on disk, catalog factories, builder and ticks.

#[cfg(test)]
mod tests {
    use crate::catalog::NodeCatalog;
    use crate::config::{ConfigOverrides, ConfigResolver, NodeConfig, RunConfig};
    use crate::errors::{NodeError, PipelineError};
    use crate::frame::{DataFrame, NodeInputs};
    use crate::identifier::NodeIdentifier;
    use crate::nodes::{FnNode, Node, NodeContract, NodeOutput};
    use crate::pipeline::{ContractEnforcement, PipelineBuilder, Runner, EndReason};
    use crate::testing::{contract_yaml, write_builtin_config, write_custom_config, write_script, CallLog};
    use crate::weights::{ensure_weights, MockWeightsDownloader, WeightsDescriptor, WeightsError};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn id(s: &str) -> NodeIdentifier {
        NodeIdentifier::parse(s).unwrap()
    }

    fn ids(items: &[&str]) -> Vec<NodeIdentifier> {
        items.iter().map(|s| id(s)).collect()
    }

    /// A node that logs its call and writes `"<name>"` to each declared output.
    fn logged(log: &CallLog) -> impl Fn(NodeConfig) -> Result<Box<dyn Node>, NodeError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |config: NodeConfig| {
            let contract = NodeContract::from_config(&config)?;
            let log = Arc::clone(&log);
            let name = contract.name.clone();
            let outputs = contract.outputs.clone();
            Ok(Box::new(FnNode::new(contract, move |_inputs: &NodeInputs<'_>| {
                log.lock().push(name.clone());
                Ok(outputs.iter().map(|k| (k.clone(), json!(name))).collect())
            })) as Box<dyn Node>)
        }
    }

    struct Fixture {
        root: TempDir,
        custom: TempDir,
        log: CallLog,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                root: TempDir::new().unwrap(),
                custom: TempDir::new().unwrap(),
                log: CallLog::default(),
            }
        }

        /// Writes a config and registers a logging factory for `identifier`.
        fn node(&self, catalog: &mut NodeCatalog, identifier: &str, inputs: &[&str], outputs: &[&str]) {
            let identifier = id(identifier);
            write_builtin_config(self.root.path(), &identifier, &contract_yaml(inputs, outputs)).unwrap();
            catalog.register(identifier, logged(&self.log));
        }

        fn catalog(&self) -> NodeCatalog {
            NodeCatalog::with_builtins(self.custom.path())
        }

        fn builder(&self, catalog: NodeCatalog) -> PipelineBuilder {
            PipelineBuilder::new(catalog, ConfigResolver::new(self.root.path(), self.custom.path()))
        }

        /// The face detection scenario: a source, a detector and a drawer.
        fn face_scenario(&self) -> PipelineBuilder {
            let mut catalog = self.catalog();
            self.node(&mut catalog, "source.none", &[], &["image"]);
            self.node(&mut catalog, "detector.face", &["image"], &["bboxes"]);
            self.node(&mut catalog, "draw.bbox", &["image", "bboxes"], &["image"]);
            self.builder(catalog)
        }
    }

    #[test]
    fn test_valid_chain_builds_with_matching_length() {
        let fx = Fixture::new();
        let pipeline = fx
            .face_scenario()
            .build(&ids(&["source.none", "detector.face", "draw.bbox"]))
            .unwrap();

        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.node_names(), vec!["source.none", "detector.face", "draw.bbox"]);
    }

    #[test]
    fn test_face_scenario_tick() {
        let fx = Fixture::new();
        let mut pipeline = fx
            .face_scenario()
            .build(&ids(&["source.none", "detector.face", "draw.bbox"]))
            .unwrap();

        let frame = pipeline
            .run_tick(DataFrame::new().with("image", json!([[0, 0], [0, 0]])))
            .unwrap();

        assert_eq!(frame.get("bboxes"), Some(&json!("detector.face")));
        assert_eq!(frame.get("image"), Some(&json!("draw.bbox")));
    }

    #[test]
    fn test_swapped_order_fails_at_position_zero() {
        let fx = Fixture::new();
        let err = fx
            .face_scenario()
            .build(&ids(&["detector.face", "source.none"]))
            .unwrap_err();

        match err {
            PipelineError::UnsatisfiedDependency(e) => {
                assert_eq!(e.index, 0);
                assert_eq!(e.node, "detector.face");
                assert_eq!(e.missing, vec!["image".to_string()]);
                assert!(e.available.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.log.lock().is_empty());
    }

    #[test]
    fn test_first_unsatisfied_node_is_reported() {
        let fx = Fixture::new();
        let mut catalog = fx.catalog();
        fx.node(&mut catalog, "a.one", &[], &["x"]);
        fx.node(&mut catalog, "a.two", &["y"], &["z"]);
        fx.node(&mut catalog, "a.three", &["q"], &[]);

        let err = fx
            .builder(catalog)
            .build(&ids(&["a.one", "a.two", "a.three"]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsatisfiedDependency(ref e) if e.index == 1));
    }

    #[test]
    fn test_empty_sequence_fails() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.face_scenario().build(&[]).unwrap_err(),
            PipelineError::EmptyPipeline
        ));
    }

    #[test]
    fn test_nodes_run_in_declared_order() {
        let fx = Fixture::new();
        let mut catalog = fx.catalog();
        fx.node(&mut catalog, "chain.a", &[], &["a"]);
        fx.node(&mut catalog, "chain.b", &["a"], &["b"]);
        fx.node(&mut catalog, "chain.c", &["b"], &["c"]);

        let mut pipeline = fx
            .builder(catalog)
            .build(&ids(&["chain.a", "chain.b", "chain.c"]))
            .unwrap();
        let frame = pipeline.run_tick(DataFrame::new()).unwrap();

        assert_eq!(fx.log.lock().as_slice(), ["chain.a", "chain.b", "chain.c"]);
        assert_eq!(frame.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_leakage_between_ticks() {
        let fx = Fixture::new();
        let mut catalog = fx.catalog();
        fx.node(&mut catalog, "src.a", &[], &["a"]);

        let mut pipeline = fx.builder(catalog).build(&ids(&["src.a"])).unwrap();

        let first = pipeline
            .run_tick(DataFrame::new().with("only_first", json!(1)))
            .unwrap();
        let second = pipeline.run_tick(DataFrame::new()).unwrap();

        assert!(first.contains_key("only_first"));
        assert!(!second.contains_key("only_first"));
        assert_eq!(second.keys(), vec!["a"]);
    }

    #[test]
    fn test_initial_keys_satisfy_first_node() {
        let fx = Fixture::new();
        let builder = fx.face_scenario().with_initial_keys(["image"]);

        let pipeline = builder.build(&ids(&["detector.face", "draw.bbox"])).unwrap();
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_weights_failure_is_node_init_error() {
        let fx = Fixture::new();
        let mut catalog = fx.catalog();
        let heavy = id("model.heavy");
        write_builtin_config(fx.root.path(), &heavy, &contract_yaml(&[], &["bboxes"])).unwrap();

        catalog.register(heavy.clone(), |config: NodeConfig| {
            let mut downloader = MockWeightsDownloader::new();
            downloader.expect_download().times(1).returning(|_, descriptor| {
                Err(WeightsError::Download {
                    url: descriptor.url.clone(),
                    message: "connection refused".to_string(),
                })
            });

            let descriptor = WeightsDescriptor::new("https://weights.invalid/heavy", ["model.bin"]);
            ensure_weights(config.root(), &descriptor, &downloader)?;
            Err(NodeError::failed("unreachable"))
        });

        let err = fx.builder(catalog).build(&[heavy]).unwrap_err();
        match err {
            PipelineError::NodeInit { identifier, source } => {
                assert_eq!(identifier, "model.heavy");
                assert!(matches!(source, NodeError::Weights(WeightsError::Download { .. })));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.root.path().join("weights").is_dir());
    }

    #[test]
    fn test_custom_script_between_builtins() {
        let fx = Fixture::new();
        write_custom_config(fx.custom.path(), "doubler", "input: [count]\noutput: [doubled]\nfactor: 2\n")
            .unwrap();
        write_script(
            fx.custom.path(),
            "doubler",
            "fn init(config) { this.factor = config.factor; }\n\
             fn run(inputs) { #{ doubled: inputs.count * this.factor } }",
        )
        .unwrap();

        let options = crate::config::PipelineOptions::new()
            .with_builtin_root(env!("CARGO_MANIFEST_DIR"))
            .with_custom_dir(fx.custom.path())
            .with_enforcement(ContractEnforcement::Strict);
        let run_config = RunConfig::from_yaml_str(
            "nodes:\n  - input.constant:\n      max_ticks: 3\n  - dabble.bbox_count\n  - custom.doubler\n",
            "run_config.yml",
        )
        .unwrap();

        let pipeline = PipelineBuilder::from_options(&options)
            .build_run_config(&run_config)
            .unwrap();

        let mut last = None;
        let summary = Runner::new(pipeline)
            .run_observed(|_| Some(DataFrame::new()), |_, frame| last = frame.get("doubled").cloned())
            .unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.end_reason, EndReason::PipelineEnd);
        assert_eq!(last, Some(json!(4)));
    }

    #[test]
    fn test_global_overrides_apply_to_every_build() {
        let fx = Fixture::new();
        let fps = id("dabble.fps");
        write_builtin_config(fx.root.path(), &fps, "input: [\"none\"]\noutput: [fps]\nwindow: 10\n").unwrap();

        let overrides = ConfigOverrides::from_json_str(r#"{"dabble.fps": {"window": 1}}"#).unwrap();
        let builder = PipelineBuilder::new(
            fx.catalog(),
            ConfigResolver::new(fx.root.path(), fx.custom.path()).with_overrides(overrides),
        );

        // A window of 1 is rejected by the node, so the override must have applied.
        let err = builder.build(&[fps]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NodeInit {
                source: NodeError::InvalidConfig { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_node_output_is_merged_over_initial_frame() {
        let fx = Fixture::new();
        let mut catalog = fx.catalog();
        fx.node(&mut catalog, "src.img", &[], &["image"]);
        let mut pipeline = fx.builder(catalog).build(&ids(&["src.img"])).unwrap();

        let out: NodeOutput = pipeline
            .run_tick(DataFrame::new().with("image", json!("raw")))
            .unwrap()
            .into_inner()
            .into_iter()
            .collect();
        assert_eq!(out.get("image"), Some(&json!("src.img")));
    }
}
