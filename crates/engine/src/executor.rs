//! Workflow execution engine.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Selects the trigger node(s) the run starts from.
//! 2. Builds the combined dependency graph and rejects cycles.
//! 3. Marks the selected triggers `Success` with the run's payload.
//! 4. Hands the in-scope nodes to the scheduler, which gates, evaluates and
//!    records each one, reporting every state change to the caller.
//! 5. Decides the verdict: every failure must be routed to an error branch
//!    that itself succeeded.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use actions::ActionExecutor;
use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    dag::DependencyGraph,
    error::EngineError,
    models::{Node, Workflow},
    scheduler::{Run, Scheduler},
    state::{ExecutionResult, NodeExecutionState},
};

const SUCCESS_MESSAGE: &str = "Workflow executed successfully";
const FAILURE_MESSAGE: &str = "Workflow execution failed";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Success text treated as "skipped" when gating and when collecting
    /// `Logic` inputs.
    pub skip_marker: String,
    /// `trigger_type` selected when a run names no trigger.
    pub manual_trigger_type: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            skip_marker: "__skip__".to_owned(),
            manual_trigger_type: "manual".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run options
// ---------------------------------------------------------------------------

/// Per-run inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Start from this trigger only; `None` starts every manual trigger.
    pub trigger_node_id: Option<String>,
    /// Published to the run as the triggers' JSON-object payload.
    pub extras: BTreeMap<String, String>,
}

impl RunOptions {
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn for_trigger(node_id: impl Into<String>) -> Self {
        Self {
            trigger_node_id: Some(node_id.into()),
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Why a run stopped before its verdict.
#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Structural(#[from] EngineError),
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

/// Stateless orchestrator; one instance can serve any number of runs.
pub struct WorkflowExecutor {
    actions: Arc<dyn ActionExecutor>,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(actions: Arc<dyn ActionExecutor>, config: ExecutorConfig) -> Self {
        Self { actions, config }
    }

    /// Run `workflow` and report every node state change to `on_state`.
    ///
    /// Never returns an error: structural problems, node failures and
    /// observer faults all end in an `ExecutionResult` with
    /// `success == false` and a descriptive `message`.  An `Err` from
    /// `on_state` stops the run at that point.
    #[instrument(
        skip_all,
        fields(workflow_id = %workflow.id, run_id = tracing::field::Empty)
    )]
    pub async fn run<F>(
        &self,
        workflow: &Workflow,
        options: RunOptions,
        on_state: F,
    ) -> ExecutionResult
    where
        F: FnMut(&str, &NodeExecutionState) -> anyhow::Result<()> + Send,
    {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        info!("starting workflow '{}'", workflow.name);

        let mut run = Run::new(workflow, on_state);
        run.log.debug(format!(
            "starting workflow '{}' ({}), run {run_id}",
            workflow.name, workflow.id
        ));

        let (success, message) = match self.drive(&mut run, &options).await {
            Ok(true) => {
                run.log
                    .debug(format!("workflow '{}' completed successfully", workflow.name));
                (true, SUCCESS_MESSAGE.to_owned())
            }
            Ok(false) => (false, FAILURE_MESSAGE.to_owned()),
            Err(RunError::Structural(err)) => (false, err.to_string()),
            Err(RunError::Fault(err)) => {
                let message = format!("workflow execution fault: {err:#}");
                run.log.error(message.clone());
                (false, message)
            }
        };

        if success {
            info!("workflow '{}' succeeded", workflow.name);
        } else {
            warn!("workflow '{}' failed: {message}", workflow.name);
        }

        let (node_results, log) = run.into_parts();
        ExecutionResult {
            run_id,
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            trigger_node_id: options.trigger_node_id,
            success,
            node_results,
            message,
            started_at,
            finished_at: Utc::now(),
            log: log.into_entries(),
        }
    }

    async fn drive<F>(&self, run: &mut Run<'_, F>, options: &RunOptions) -> Result<bool, RunError>
    where
        F: FnMut(&str, &NodeExecutionState) -> anyhow::Result<()> + Send,
    {
        let workflow = run.workflow;
        let triggers = self.select_triggers(run, options)?;

        let graph = DependencyGraph::build(workflow);
        if graph.has_cycle(workflow.nodes.iter().map(|n| n.id.as_str())) {
            run.log.error("circular dependency detected in workflow");
            return Err(EngineError::CycleDetected.into());
        }

        let payload =
            serde_json::to_string(&options.extras).context("failed to encode trigger payload")?;
        for trigger in &triggers {
            run.log.node_debug(
                trigger,
                format!("trigger '{}' ({}) started", trigger.label(), trigger.id),
            );
            run.transition(&trigger.id, NodeExecutionState::Success(payload.clone()))?;
        }

        let started: HashSet<&str> = triggers.iter().map(|t| t.id.as_str()).collect();
        let scheduler = Scheduler {
            graph: &graph,
            actions: self.actions.as_ref(),
            config: &self.config,
            started: &started,
            trigger_payload: &payload,
        };
        Ok(scheduler.run(run).await?)
    }

    fn select_triggers<'w, F>(
        &self,
        run: &mut Run<'w, F>,
        options: &RunOptions,
    ) -> Result<Vec<&'w Node>, EngineError> {
        let workflow = run.workflow;
        let all: Vec<&'w Node> = workflow.nodes.iter().filter(|n| n.is_trigger()).collect();
        if all.is_empty() {
            run.log.warn("workflow has no trigger node");
            return Err(EngineError::NoTriggerNode);
        }

        let selected = match &options.trigger_node_id {
            Some(id) => {
                let Some(node) = all.iter().copied().find(|n| &n.id == id) else {
                    run.log.warn(format!("trigger node '{id}' does not exist"));
                    return Err(EngineError::TriggerNotFound(id.clone()));
                };
                vec![node]
            }
            None => {
                let manual_type = self.config.manual_trigger_type.as_str();
                let manual: Vec<&'w Node> = all
                    .into_iter()
                    .filter(|n| n.trigger_type() == Some(manual_type))
                    .collect();
                if manual.is_empty() {
                    run.log.warn("workflow has no manual trigger node");
                    return Err(EngineError::NoManualTrigger);
                }
                manual
            }
        };

        let names: Vec<&str> = selected.iter().map(|n| n.label()).collect();
        run.log.debug(format!(
            "starting from {} trigger node(s): {}",
            selected.len(),
            names.join(", ")
        ));
        Ok(selected)
    }
}
