//! `flowrun` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: statically check a workflow JSON file.
//! - `run`: execute a workflow JSON file and print the result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use actions::{builtin::EchoAction, ActionRegistry};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::{ExecutorConfig, NodeExecutionState, RunOptions, Workflow, WorkflowExecutor};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "flowrun",
    about = "Dependency-driven workflow executor",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Execute a workflow definition JSON file.
    Run {
        /// Path to the workflow JSON file.
        path: PathBuf,
        /// Start from this trigger node instead of every manual trigger.
        #[arg(long)]
        trigger: Option<String>,
        /// Run-time extra published in the trigger payload (repeatable).
        #[arg(long = "extra", value_name = "KEY=VALUE", value_parser = parse_extra)]
        extras: Vec<(String, String)>,
        /// JSON file with executor settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_extra(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_owned(), v.to_owned()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => {
            let workflow: Workflow = read_json(&path)?;
            match engine::validate_dag(&workflow) {
                Ok(order) => {
                    println!("Workflow is valid. Execution order: {order:?}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Validation failed: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Run {
            path,
            trigger,
            extras,
            config,
        } => {
            let workflow: Workflow = read_json(&path)?;
            let config: ExecutorConfig = match config {
                Some(config_path) => read_json(&config_path)?,
                None => ExecutorConfig::default(),
            };

            let mut registry = ActionRegistry::new();
            registry.register("echo", Arc::new(EchoAction));

            let options = RunOptions {
                trigger_node_id: trigger,
                extras: extras.into_iter().collect::<BTreeMap<_, _>>(),
            };

            let executor = WorkflowExecutor::new(Arc::new(registry), config);
            let result = executor
                .run(&workflow, options, |node_id: &str, state: &NodeExecutionState| {
                    info!(node_id, %state, "node state changed");
                    Ok(())
                })
                .await;

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
