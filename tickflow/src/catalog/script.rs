//! Custom nodes written as Rhai scripts.
//!
//! A script lives at `<custom_dir>/<name>.rhai` and defines:
//!
//! ```rhai
//! // Optional. Called once with the node's config; `this` is the node state.
//! fn init(config) {
//!     this.step = config.step;
//!     this.total = 0;
//! }
//!
//! // Required. Called every tick with the visible inputs; returns a map of
//! // outputs, or nothing.
//! fn run(inputs) {
//!     this.total += this.step;
//!     #{ total: this.total }
//! }
//! ```
//!
//! Scripts run unsandboxed in-process. `print` and `debug` go to the log, and
//! `has_weights(root, paths)` is available for weight checks.

use crate::config::NodeConfig;
use crate::errors::{NodeError, PipelineError};
use crate::frame::NodeInputs;
use crate::identifier::NodeIdentifier;
use crate::nodes::{Node, NodeContract, NodeOutput};
use crate::weights::has_weights;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Scope, AST};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File extension of script nodes.
pub const SCRIPT_EXTENSION: &str = "rhai";

const INIT_FN: &str = "init";
const RUN_FN: &str = "run";

fn script_error(err: impl std::fmt::Display) -> NodeError {
    NodeError::Script(err.to_string())
}

fn build_engine(node: &str) -> Engine {
    let mut engine = Engine::new();

    let print_node = node.to_string();
    engine.on_print(move |s| info!(node = %print_node, "{s}"));

    let debug_node = node.to_string();
    engine.on_debug(move |s, _source, pos| debug!(node = %debug_node, position = %pos, "{s}"));

    engine.register_fn(
        "has_weights",
        |root: &str, paths: rhai::Array| -> Result<bool, Box<EvalAltResult>> {
            let paths: Vec<String> = paths.into_iter().filter_map(|p| p.into_string().ok()).collect();
            has_weights(Path::new(root), &paths).map_err(|e| e.to_string().into())
        },
    );

    engine
}

fn defines(ast: &AST, name: &str, arity: usize) -> bool {
    ast.iter_functions().any(|f| f.name == name && f.params.len() == arity)
}

/// A compiled script, ready to be instantiated.
#[derive(Debug, Clone)]
pub struct ScriptImplementation {
    identifier: NodeIdentifier,
    path: PathBuf,
    engine: Arc<Engine>,
    ast: Arc<AST>,
}

impl ScriptImplementation {
    /// Reads and compiles the script at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `NodeInit` if it does not
    /// compile or lacks `fn run(inputs)`.
    pub fn load(identifier: &NodeIdentifier, path: &Path) -> Result<Self, PipelineError> {
        let source = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::compile(identifier, path, &source)
    }

    /// Compiles script source. `path` is only used for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns `NodeInit` if the script does not compile or lacks
    /// `fn run(inputs)`.
    pub fn compile(
        identifier: &NodeIdentifier,
        path: &Path,
        source: &str,
    ) -> Result<Self, PipelineError> {
        let name = identifier.to_string();
        let engine = build_engine(&name);

        let ast = engine
            .compile(source)
            .map_err(|e| PipelineError::node_init(&name, script_error(e)))?;
        if !defines(&ast, RUN_FN, 1) {
            return Err(PipelineError::node_init(
                &name,
                NodeError::Script(format!("{} must define fn {RUN_FN}(inputs)", path.display())),
            ));
        }

        debug!(node = %name, path = %path.display(), "Compiled script node");
        Ok(Self {
            identifier: identifier.clone(),
            path: path.to_path_buf(),
            engine: Arc::new(engine),
            ast: Arc::new(ast),
        })
    }

    /// Returns the node identifier.
    #[must_use]
    pub fn identifier(&self) -> &NodeIdentifier {
        &self.identifier
    }

    /// Returns the script path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a node, running the script's `init` if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the contract is malformed or `init` fails.
    pub fn instantiate(&self, config: &NodeConfig) -> Result<ScriptNode, NodeError> {
        let contract = NodeContract::from_config(config)?;
        let mut state = Dynamic::from_map(rhai::Map::new());

        if defines(&self.ast, INIT_FN, 1) {
            let config = rhai::serde::to_dynamic(config.to_value()).map_err(script_error)?;
            let options = CallFnOptions::new().eval_ast(false).bind_this_ptr(&mut state);
            // The return value of `init` is ignored; only `this` is kept.
            let _ = self
                .engine
                .call_fn_with_options::<Dynamic>(options, &mut Scope::new(), &self.ast, INIT_FN, (config,))
                .map_err(script_error)?;
        }

        Ok(ScriptNode {
            contract,
            engine: Arc::clone(&self.engine),
            ast: Arc::clone(&self.ast),
            state,
        })
    }
}

/// A running script node.
#[derive(Debug)]
pub struct ScriptNode {
    contract: NodeContract,
    engine: Arc<Engine>,
    ast: Arc<AST>,
    state: Dynamic,
}

impl ScriptNode {
    /// Returns the script's `this` state.
    #[must_use]
    pub fn state(&self) -> &Dynamic {
        &self.state
    }
}

impl Node for ScriptNode {
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
        let mut visible = rhai::Map::new();
        for (key, value) in inputs.visible() {
            visible.insert(key.into(), rhai::serde::to_dynamic(value).map_err(script_error)?);
        }

        let options = CallFnOptions::new().eval_ast(false).bind_this_ptr(&mut self.state);
        let result = self
            .engine
            .call_fn_with_options::<Dynamic>(options, &mut Scope::new(), &self.ast, RUN_FN, (visible,))
            .map_err(script_error)?;

        if result.is_unit() {
            return Ok(NodeOutput::new());
        }
        match rhai::serde::from_dynamic::<serde_json::Value>(&result).map_err(script_error)? {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(NodeError::Script(format!(
                "fn {RUN_FN} must return a map of outputs, got {other}"
            ))),
        }
    }
}
