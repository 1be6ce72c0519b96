//! Pipeline assembly, validation and execution.

mod builder;
mod enforcement;
mod executor;
mod integration_tests;
mod runner;
mod validation;

pub use builder::PipelineBuilder;
pub use enforcement::ContractEnforcement;
pub use executor::{Pipeline, PipelineNode};
pub use runner::{EndReason, RunSummary, Runner, RunnerConfig, StopToken, TickFailurePolicy};
pub use validation::{validate_chain, ChainLink};
