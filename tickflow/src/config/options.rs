//! Options controlling how pipelines are assembled.

use super::ConfigOverrides;
use crate::pipeline::ContractEnforcement;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the built-in search root.
pub const HOME_ENV_VAR: &str = "TICKFLOW_HOME";

/// Assembly options for [`crate::pipeline::PipelineBuilder::from_options`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Base directory of the built-in node configs.
    #[serde(default = "default_builtin_root")]
    pub builtin_root: PathBuf,
    /// Directory holding custom node scripts and their configs.
    #[serde(default = "default_custom_dir")]
    pub custom_dir: PathBuf,
    /// Frame keys guaranteed present before the first node runs.
    #[serde(default)]
    pub initial_keys: Vec<String>,
    /// Runtime contract enforcement mode.
    #[serde(default)]
    pub enforcement: ContractEnforcement,
    /// Global per-node config overrides.
    #[serde(default)]
    pub overrides: ConfigOverrides,
}

/// Built-in root: `$TICKFLOW_HOME`, else this crate's directory.
#[must_use]
pub fn default_builtin_root() -> PathBuf {
    std::env::var_os(HOME_ENV_VAR)
        .map_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")), PathBuf::from)
}

fn default_custom_dir() -> PathBuf {
    PathBuf::from("src").join("custom_nodes")
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            builtin_root: default_builtin_root(),
            custom_dir: default_custom_dir(),
            initial_keys: Vec::new(),
            enforcement: ContractEnforcement::default(),
            overrides: ConfigOverrides::default(),
        }
    }
}

impl PipelineOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the built-in search root.
    #[must_use]
    pub fn with_builtin_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.builtin_root = root.into();
        self
    }

    /// Sets the custom nodes directory.
    #[must_use]
    pub fn with_custom_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.custom_dir = dir.into();
        self
    }

    /// Sets the initial keys.
    #[must_use]
    pub fn with_initial_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.initial_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the enforcement mode.
    #[must_use]
    pub fn with_enforcement(mut self, enforcement: ContractEnforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    /// Sets the global overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}
