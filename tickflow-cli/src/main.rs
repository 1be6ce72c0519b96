//! tickflow: build and run declarative node pipelines from a run config.
//!
//! Commands:
//! - `init`: scaffold a project with a custom nodes folder and `run_config.yml`
//! - `run`: build the pipeline described by a run config and tick it until it ends
//! - `nodes`: list the built-in nodes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tickflow::config::RUN_CONFIG_FILE;
use tickflow::nodes::builtin::BUILTIN_NODES;
use tickflow::prelude::*;
use tracing::{error, info, warn};

const BUILTIN_ROOT_HELP: &str = "Built-in node configs are read from $TICKFLOW_HOME/configs. \
When TICKFLOW_HOME is unset, the tickflow source directory recorded at compile time is used, \
so an installed binary must set TICKFLOW_HOME to a directory holding the shipped configs/ tree.";

#[derive(Parser)]
#[command(name = "tickflow")]
#[command(about = "Declarative, validated, tick-driven node pipelines")]
#[command(version)]
struct Cli {
    /// Log level filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project skeleton in the current directory
    #[command(after_help = BUILTIN_ROOT_HELP)]
    Init {
        /// Name of the folder under `src/` holding custom nodes
        #[arg(long, default_value = "custom_nodes")]
        custom_folder_name: String,
    },

    /// Build and run a pipeline
    #[command(after_help = BUILTIN_ROOT_HELP)]
    Run {
        /// Path to the run config
        #[arg(long, default_value = RUN_CONFIG_FILE)]
        config_path: PathBuf,

        /// JSON object of per-node overrides, e.g. '{"dabble.fps": {"window": 5}}'
        #[arg(long)]
        node_config: Option<String>,

        /// Directory holding custom node scripts and configs
        #[arg(long)]
        custom_dir: Option<PathBuf>,

        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Runtime contract enforcement: off, warn or strict
        #[arg(long, default_value = "off")]
        enforcement: ContractEnforcement,
    },

    /// List built-in nodes
    Nodes {
        /// Only show nodes in this namespace
        namespace: Option<String>,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let result = match cli.command {
        Commands::Init { custom_folder_name } => {
            init_project(Path::new("."), &custom_folder_name).map(|_| ())
        }
        Commands::Run {
            config_path,
            node_config,
            custom_dir,
            max_ticks,
            enforcement,
        } => run(RunArgs {
            config_path,
            node_config,
            custom_dir,
            max_ticks,
            enforcement,
        }),
        Commands::Nodes { namespace } => {
            for (identifier, summary) in list_nodes(namespace.as_deref()) {
                println!("{identifier:<20} {summary}");
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Prints an error, with the pipeline's fix hint when there is one.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<PipelineError>() {
        Some(pipeline_err) => {
            let info = pipeline_err.error_info();
            error!(code = %info.code, "{pipeline_err}");
            if let Some(hint) = info.fix_hint {
                eprintln!("hint: {hint}");
            }
        }
        None => error!("{err:#}"),
    }
}

/// Creates `src/<custom_folder>/configs` and a default run config under `root`.
///
/// An existing run config is left untouched.
fn init_project(root: &Path, custom_folder: &str) -> Result<PathBuf> {
    let configs = root.join("src").join(custom_folder).join("configs");
    std::fs::create_dir_all(&configs)
        .with_context(|| format!("Failed to create {}", configs.display()))?;

    let run_config = root.join(RUN_CONFIG_FILE);
    if run_config.exists() {
        warn!(path = %run_config.display(), "Run config already exists, leaving it as is");
        return Ok(run_config);
    }

    let yaml = RunConfig::default_config()
        .to_yaml()
        .context("Failed to serialize the default run config")?;
    std::fs::write(&run_config, yaml)
        .with_context(|| format!("Failed to write {}", run_config.display()))?;
    info!(path = %run_config.display(), custom_dir = %configs.display(), "Initialized project");
    Ok(run_config)
}

fn list_nodes(namespace: Option<&str>) -> Vec<(&'static str, &'static str)> {
    BUILTIN_NODES
        .iter()
        .filter(|(identifier, _)| {
            namespace.map_or(true, |ns| identifier.split('.').next() == Some(ns))
        })
        .copied()
        .collect()
}

struct RunArgs {
    config_path: PathBuf,
    node_config: Option<String>,
    custom_dir: Option<PathBuf>,
    max_ticks: Option<u64>,
    enforcement: ContractEnforcement,
}

fn pipeline_options(args: &RunArgs) -> Result<PipelineOptions> {
    let mut options = PipelineOptions::new().with_enforcement(args.enforcement);
    if let Some(dir) = &args.custom_dir {
        options = options.with_custom_dir(dir);
    }
    if let Some(json) = &args.node_config {
        let overrides =
            ConfigOverrides::from_json_str(json).context("--node-config must be a JSON object")?;
        options = options.with_overrides(overrides);
    }
    Ok(options)
}

fn run(args: RunArgs) -> Result<()> {
    let options = pipeline_options(&args)?;
    let run_config = RunConfig::from_path(&args.config_path)?;
    let pipeline = PipelineBuilder::from_options(&options).build_run_config(&run_config)?;

    let mut config = RunnerConfig::new();
    if let Some(max_ticks) = args.max_ticks {
        config = config.with_max_ticks(max_ticks);
    }
    let mut runner = Runner::new(pipeline).with_config(config);
    let stop = runner.stop_token();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start the runtime")?;
    let summary = runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current tick");
                stop.stop("interrupted");
            }
        });

        tokio::task::spawn_blocking(move || runner.run_until_end())
            .await
            .context("Runner thread panicked")
    })??;

    info!(
        run_id = %summary.run_id,
        ticks = summary.ticks,
        failed_ticks = summary.failed_ticks,
        duration_ms = summary.duration_ms,
        "Run finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout_and_loadable_run_config() {
        let dir = TempDir::new().unwrap();
        let path = init_project(dir.path(), "my_nodes").unwrap();

        assert!(dir.path().join("src/my_nodes/configs").is_dir());
        let config = RunConfig::from_path(&path).unwrap();
        assert_eq!(config, RunConfig::default_config());
    }

    #[test]
    fn test_init_keeps_existing_run_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(RUN_CONFIG_FILE), "nodes: [dabble.fps]\n").unwrap();

        init_project(dir.path(), "custom_nodes").unwrap();

        let contents = std::fs::read_to_string(dir.path().join(RUN_CONFIG_FILE)).unwrap();
        assert_eq!(contents, "nodes: [dabble.fps]\n");
    }

    #[test]
    fn test_list_nodes_filters_by_namespace() {
        let dabble: Vec<_> = list_nodes(Some("dabble")).into_iter().map(|(id, _)| id).collect();
        assert_eq!(dabble, vec!["dabble.bbox_count", "dabble.fps", "dabble.tracking"]);
        assert_eq!(list_nodes(None).len(), BUILTIN_NODES.len());
        assert!(list_nodes(Some("missing")).is_empty());
    }

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "tickflow",
            "run",
            "--node-config",
            r#"{"dabble.fps": {"window": 5}}"#,
            "--max-ticks",
            "3",
            "--enforcement",
            "strict",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                config_path,
                max_ticks,
                enforcement,
                node_config,
                ..
            } => {
                assert_eq!(config_path, PathBuf::from(RUN_CONFIG_FILE));
                assert_eq!(max_ticks, Some(3));
                assert_eq!(enforcement, ContractEnforcement::Strict);
                assert!(node_config.is_some());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_help_explains_builtin_root() {
        use clap::CommandFactory;

        let mut cli = Cli::command();
        for name in ["init", "run"] {
            let help = cli
                .find_subcommand_mut(name)
                .unwrap()
                .render_long_help()
                .to_string();
            assert!(help.contains(tickflow::config::HOME_ENV_VAR), "{name} help: {help}");
        }
    }

    #[test]
    fn test_bad_enforcement_is_rejected() {
        assert!(Cli::try_parse_from(["tickflow", "run", "--enforcement", "loud"]).is_err());
    }

    #[test]
    fn test_invalid_node_config_is_reported() {
        let args = RunArgs {
            config_path: PathBuf::from(RUN_CONFIG_FILE),
            node_config: Some("not json".to_string()),
            custom_dir: None,
            max_ticks: None,
            enforcement: ContractEnforcement::Off,
        };
        assert!(pipeline_options(&args).is_err());
    }

    #[test]
    fn test_run_default_project_to_completion() {
        let dir = TempDir::new().unwrap();
        let path = init_project(dir.path(), "custom_nodes").unwrap();

        let args = RunArgs {
            config_path: path,
            node_config: Some(r#"{"input.constant": {"max_ticks": 2}}"#.to_string()),
            custom_dir: Some(dir.path().join("src/custom_nodes")),
            max_ticks: Some(10),
            enforcement: ContractEnforcement::Strict,
        };
        run(args).unwrap();
    }
}
