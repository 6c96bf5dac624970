//! Dependency-driven node scheduling.
//!
//! Node states live in a [`Run`] and only change through
//! [`Run::transition`], which also notifies the caller's observer.  The
//! [`Scheduler`] drains a FIFO ready queue fed by in-degree counting over
//! the in-scope part of the dependency graph.

use std::collections::{HashMap, HashSet, VecDeque};

use actions::ActionExecutor;
use anyhow::Context;

use crate::{
    dag::DependencyGraph,
    evaluator::{self, EvalScope, Evaluation},
    executor::ExecutorConfig,
    gate::{is_error_condition, GateView},
    logger::RunLogger,
    models::{Connection, Node, Workflow},
    state::{NodeExecutionState, SKIP_CONDITION_NOT_MET},
};

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Mutable state of a single run.
pub(crate) struct Run<'w, F> {
    pub workflow: &'w Workflow,
    pub nodes: HashMap<&'w str, &'w Node>,
    pub results: HashMap<String, NodeExecutionState>,
    pub log: RunLogger,
    observer: F,
}

impl<'w, F> Run<'w, F>
where
    F: FnMut(&str, &NodeExecutionState) -> anyhow::Result<()> + Send,
{
    pub fn new(workflow: &'w Workflow, observer: F) -> Self {
        Self {
            workflow,
            nodes: workflow.nodes.iter().map(|n| (n.id.as_str(), n)).collect(),
            results: HashMap::new(),
            log: RunLogger::new(),
            observer,
        }
    }

    /// Record `state` for `node_id` and notify the observer.
    pub fn transition(&mut self, node_id: &str, state: NodeExecutionState) -> anyhow::Result<()> {
        self.results.insert(node_id.to_owned(), state.clone());
        (self.observer)(node_id, &state)
            .with_context(|| format!("state observer rejected update for node '{node_id}'"))
    }

    pub fn into_parts(self) -> (HashMap<String, NodeExecutionState>, RunLogger) {
        (self.results, self.log)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub(crate) struct Scheduler<'r> {
    pub graph: &'r DependencyGraph,
    pub actions: &'r dyn ActionExecutor,
    pub config: &'r ExecutorConfig,
    /// Triggers already marked `Success` for this run.
    pub started: &'r HashSet<&'r str>,
    pub trigger_payload: &'r str,
}

impl Scheduler<'_> {
    /// Process every in-scope node, then report whether all failures were
    /// handled.  An `Err` is an observer fault and aborts the run.
    pub async fn run<F>(&self, run: &mut Run<'_, F>) -> anyhow::Result<bool>
    where
        F: FnMut(&str, &NodeExecutionState) -> anyhow::Result<()> + Send,
    {
        let workflow = run.workflow;
        let in_scope = self.graph.reachable_from(self.started.iter().copied());
        let triggers: HashSet<&str> = workflow
            .nodes
            .iter()
            .filter(|n| n.is_trigger())
            .map(|n| n.id.as_str())
            .collect();

        // Triggers never enter the queue; edges leaving them are not counted.
        let mut in_degree: HashMap<&str, usize> = workflow
            .nodes
            .iter()
            .filter(|n| !n.is_trigger() && in_scope.contains(&n.id))
            .map(|n| (n.id.as_str(), 0))
            .collect();
        for (source, targets) in self.graph.adjacency() {
            if !in_scope.contains(source) || triggers.contains(source.as_str()) {
                continue;
            }
            for target in targets {
                if let Some(degree) = in_degree.get_mut(target.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut incoming_by_target: HashMap<&str, Vec<&Connection>> = HashMap::new();
        for connection in &workflow.connections {
            incoming_by_target
                .entry(connection.target_node_id.as_str())
                .or_default()
                .push(connection);
        }

        // Connections from out-of-scope nodes or un-started triggers do not
        // take part in gating.
        let qualifies = |connection: &Connection| {
            let source = connection.source_node_id.as_str();
            in_scope.contains(source)
                && (!triggers.contains(source) || self.started.contains(source))
        };

        let mut queue: VecDeque<&str> = workflow
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut has_failure = false;

        while let Some(node_id) = queue.pop_front() {
            if run.results.contains_key(node_id) {
                run.log.debug(format!("node '{node_id}' already processed, skipping"));
                continue;
            }
            let Some(node) = run.nodes.get(node_id).copied() else {
                run.log.warn(format!("node '{node_id}' does not exist, skipping"));
                continue;
            };

            let incoming: Vec<&Connection> = incoming_by_target
                .get(node_id)
                .into_iter()
                .flatten()
                .copied()
                .filter(|c| qualifies(*c))
                .collect();

            let should_execute = GateView {
                nodes: &run.nodes,
                results: &run.results,
                skip_marker: &self.config.skip_marker,
            }
            .should_execute(&incoming);

            if should_execute {
                if !self.execute_node(run, node, &incoming).await? {
                    has_failure = true;
                }
            } else {
                run.log.node_debug(
                    node,
                    format!("condition not met, skipping node '{}'", node.label()),
                );
                run.transition(
                    &node.id,
                    NodeExecutionState::Skipped(SKIP_CONDITION_NOT_MET.to_owned()),
                )?;
            }

            for next in self.graph.successors(node_id) {
                if let Some(degree) = in_degree.get_mut(next.as_str()) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if !has_failure {
            return Ok(true);
        }

        let unhandled = unhandled_failures(workflow, &run.results);
        for node in &unhandled {
            let message = format!(
                "failure of node '{}' was not handled by an error branch",
                node.label()
            );
            run.log.node_warn(node, message);
        }
        Ok(unhandled.is_empty())
    }

    /// Evaluate one gated-in node.  Returns `false` when it ended `Failed`.
    async fn execute_node<F>(
        &self,
        run: &mut Run<'_, F>,
        node: &Node,
        incoming: &[&Connection],
    ) -> anyhow::Result<bool>
    where
        F: FnMut(&str, &NodeExecutionState) -> anyhow::Result<()> + Send,
    {
        run.log.node_debug(node, format!("executing node '{}'", node.label()));
        if evaluator::marks_running(node) {
            run.transition(&node.id, NodeExecutionState::Running)?;
        }

        let scope = EvalScope {
            results: &run.results,
            incoming,
            actions: self.actions,
            skip_marker: &self.config.skip_marker,
            trigger_payload: self.trigger_payload,
        };
        let evaluation = evaluator::evaluate(node, &scope, &mut run.log).await;

        match evaluation {
            Evaluation::Completed(text) => {
                run.transition(&node.id, NodeExecutionState::Success(text))?;
                Ok(true)
            }
            Evaluation::Skipped(reason) => {
                run.transition(&node.id, NodeExecutionState::Skipped(reason.to_owned()))?;
                Ok(true)
            }
            Evaluation::Failed(err) => {
                run.log.node_error(node, format!("node '{}' failed: {err}", node.label()));
                run.transition(&node.id, NodeExecutionState::Failed(err.to_string()))?;
                Ok(false)
            }
        }
    }
}

/// Failed nodes lacking an error-routing connection whose target succeeded.
fn unhandled_failures<'w>(
    workflow: &'w Workflow,
    results: &HashMap<String, NodeExecutionState>,
) -> Vec<&'w Node> {
    workflow
        .nodes
        .iter()
        .filter(|node| results.get(&node.id).is_some_and(NodeExecutionState::is_failed))
        .filter(|node| {
            !workflow.connections.iter().any(|c| {
                c.source_node_id == node.id
                    && is_error_condition(c.condition.as_deref())
                    && results
                        .get(&c.target_node_id)
                        .is_some_and(NodeExecutionState::is_success)
            })
        })
        .collect()
}
