//! Testing utilities for tickflow pipelines.
//!
//! This module provides:
//! - Mock nodes that emit fixed values, record calls or fail on demand
//! - Helpers that lay out node configs and scripts on disk

mod fixtures;
mod mocks;

pub use fixtures::{contract_yaml, write_builtin_config, write_custom_config, write_script};
pub use mocks::{CallLog, FailingNode, RecordingNode, StaticNode};
