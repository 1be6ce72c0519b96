//! Node configuration, user overrides and the declarative run config.

mod loader;
mod node_config;
mod options;
mod overrides;
mod run_config;

pub use loader::{ConfigLayout, ConfigLoader, ConfigResolver, CONFIGS_DIR, CONFIG_EXTENSION};
pub use node_config::{NodeConfig, INPUT_KEY, NONE_MARKER, OUTPUT_KEY, ROOT_KEY};
pub use options::{default_builtin_root, PipelineOptions, HOME_ENV_VAR};
pub use overrides::{apply_overrides, ConfigOverrides};
pub use run_config::{NodeEntry, RunConfig, RUN_CONFIG_FILE};
