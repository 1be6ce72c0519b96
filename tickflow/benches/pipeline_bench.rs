//! Benchmarks for pipeline assembly and tick execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use tickflow::nodes::Node;
use tickflow::prelude::*;
use tickflow::pipeline::PipelineNode;
use tickflow::testing::{RecordingNode, StaticNode};

fn chain(len: usize, enforcement: ContractEnforcement) -> Pipeline {
    let mut nodes: Vec<PipelineNode> = vec![PipelineNode::from(
        Box::new(StaticNode::new("source", [("k0", json!(0))])) as Box<dyn Node>,
    )];
    for i in 1..len {
        let node = StaticNode::new(format!("n{i}"), [(format!("k{i}"), json!(i))])
            .with_inputs([format!("k{}", i - 1)]);
        nodes.push(PipelineNode::from(Box::new(node) as Box<dyn Node>));
    }
    Pipeline::assemble(nodes, vec![], enforcement).unwrap()
}

fn pipeline_benchmark(c: &mut Criterion) {
    let mut off = chain(16, ContractEnforcement::Off);
    c.bench_function("run_tick_16_nodes", |b| {
        b.iter(|| black_box(off.run_tick(DataFrame::new()).unwrap()));
    });

    let mut strict = chain(16, ContractEnforcement::Strict);
    c.bench_function("run_tick_16_nodes_strict", |b| {
        b.iter(|| black_box(strict.run_tick(DataFrame::new()).unwrap()));
    });

    c.bench_function("assemble_64_nodes", |b| {
        b.iter(|| black_box(chain(64, ContractEnforcement::Off).len()));
    });

    let options = PipelineOptions::new()
        .with_builtin_root(env!("CARGO_MANIFEST_DIR"))
        .with_custom_dir("/unused");
    let builder = PipelineBuilder::from_options(&options);
    let mut builtins = builder.build_run_config(&RunConfig::default_config()).unwrap();
    let mut recorder = Pipeline::assemble(
        vec![PipelineNode::from(Box::new(RecordingNode::new("r")) as Box<dyn Node>)],
        vec![],
        ContractEnforcement::Off,
    )
    .unwrap();
    c.bench_function("run_tick_builtins", |b| {
        b.iter(|| black_box(builtins.run_tick(DataFrame::new()).unwrap()));
    });
    c.bench_function("run_tick_recording", |b| {
        b.iter(|| black_box(recorder.run_tick(DataFrame::new().with("x", json!(1))).unwrap()));
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
