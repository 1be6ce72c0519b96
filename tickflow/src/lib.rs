//! # Tickflow
//!
//! Declarative assembly and tick-driven execution of linear node pipelines.
//!
//! A pipeline is an ordered list of nodes. Each node declares the frame keys
//! it reads and writes; the builder checks that the declared order forms a
//! chain in which every input is produced upstream, then the pipeline runs
//! all nodes once per tick over a shared data frame.
//!
//! - **Config resolution**: per-node YAML documents merged with user overrides
//! - **Node catalog**: built-in factories plus Rhai scripts for custom nodes
//! - **Validation**: unsatisfied dependencies are reported before anything runs
//! - **Runner**: repeated ticks until the input ends or a node asks to stop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickflow::prelude::*;
//!
//! let builder = PipelineBuilder::from_options(&PipelineOptions::default());
//! let pipeline = builder.build_run_config(&RunConfig::from_path("run_config.yml")?)?;
//!
//! let summary = Runner::new(pipeline).run_until_end()?;
//! println!("ran {} ticks", summary.ticks);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod catalog;
pub mod config;
pub mod errors;
pub mod frame;
pub mod identifier;
pub mod nodes;
pub mod observability;
pub mod pipeline;
pub mod testing;
pub mod weights;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::{ImplementationHandle, NodeCatalog, NodeFactory};
    pub use crate::config::{
        ConfigOverrides, ConfigResolver, NodeConfig, NodeEntry, PipelineOptions, RunConfig,
    };
    pub use crate::errors::{ContractErrorInfo, NodeError, PipelineError, UnsatisfiedDependencyError};
    pub use crate::frame::{DataFrame, NodeInputs, PIPELINE_END_KEY};
    pub use crate::identifier::NodeIdentifier;
    pub use crate::nodes::{FnNode, Node, NodeContract, NodeOutput};
    pub use crate::pipeline::{
        ContractEnforcement, EndReason, Pipeline, PipelineBuilder, RunSummary, Runner,
        RunnerConfig, StopToken, TickFailurePolicy,
    };
    pub use crate::weights::{ensure_weights, has_weights, WeightsDescriptor, WeightsDownloader};
}
