//! Per-kind node computation.
//!
//! The evaluator only computes; recording states and notifying the observer
//! is the scheduler's job.

use std::collections::HashMap;

use actions::{ActionExecutor, ActionParameter};

use crate::{
    compare::compare,
    error::EvalError,
    extract,
    gate::{is_skip_like, parse_bool_like},
    logger::RunLogger,
    models::{
        ConditionNode, Connection, ExecuteNode, ExtractMode, ExtractNode, LogicNode,
        LogicOperator, Node, NodeKind,
    },
    resolve::resolve_parameter,
    state::{NodeExecutionState, SKIP_NON_EXECUTE_NODE},
};

/// Read-only view of the run handed to the evaluator.
pub(crate) struct EvalScope<'a> {
    pub results: &'a HashMap<String, NodeExecutionState>,
    /// Qualifying incoming connections of the node being evaluated.
    pub incoming: &'a [&'a Connection],
    pub actions: &'a dyn ActionExecutor,
    pub skip_marker: &'a str,
    pub trigger_payload: &'a str,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Evaluation {
    Completed(String),
    Failed(EvalError),
    Skipped(&'static str),
}

impl From<Result<String, EvalError>> for Evaluation {
    fn from(result: Result<String, EvalError>) -> Self {
        match result {
            Ok(text) => Self::Completed(text),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Triggers are seeded straight to `Success`; every other kind passes
/// through `Running` first.
pub(crate) fn marks_running(node: &Node) -> bool {
    !node.is_trigger()
}

pub(crate) async fn evaluate(
    node: &Node,
    scope: &EvalScope<'_>,
    log: &mut RunLogger,
) -> Evaluation {
    match &node.kind {
        NodeKind::Trigger(_) => Evaluation::Completed(scope.trigger_payload.to_owned()),
        NodeKind::Condition(condition) => evaluate_condition(condition, scope).into(),
        NodeKind::Logic(logic) => Evaluation::Completed(evaluate_logic(logic, scope).to_string()),
        NodeKind::Extract(extract) => evaluate_extract(extract, scope).into(),
        NodeKind::Execute(execute) => evaluate_execute(node, execute, scope, log).await,
        NodeKind::Unsupported => {
            log.node_debug(node, format!("skipping non-execute node '{}'", node.label()));
            Evaluation::Skipped(SKIP_NON_EXECUTE_NODE)
        }
    }
}

fn evaluate_condition(
    condition: &ConditionNode,
    scope: &EvalScope<'_>,
) -> Result<String, EvalError> {
    let left = resolve_parameter(&condition.left, scope.results)?;
    let right = resolve_parameter(&condition.right, scope.results)?;
    Ok(compare(&left, &right, condition.operator)?.to_string())
}

/// Zero usable inputs is `false` for both operators.
fn evaluate_logic(logic: &LogicNode, scope: &EvalScope<'_>) -> bool {
    let inputs: Vec<bool> = scope
        .incoming
        .iter()
        .filter_map(|connection| {
            let state = scope.results.get(&connection.source_node_id);
            if is_skip_like(state, scope.skip_marker) {
                return None;
            }
            state?.success_text().and_then(parse_bool_like)
        })
        .collect();

    match logic.operator {
        LogicOperator::And => !inputs.is_empty() && inputs.iter().all(|&b| b),
        LogicOperator::Or => inputs.iter().any(|&b| b),
    }
}

fn evaluate_extract(node: &ExtractNode, scope: &EvalScope<'_>) -> Result<String, EvalError> {
    let source = if node.mode.reads_source() {
        source_text(node, scope)?
    } else {
        String::new()
    };

    let value = match node.mode {
        ExtractMode::Regex => {
            extract::by_regex(&source, &node.expression, node.group, &node.default_value)
        }
        ExtractMode::Json => extract::by_json_path(&source, &node.expression, &node.default_value),
        ExtractMode::Sub => {
            extract::substring(&source, node.start_index, node.length, &node.default_value)
        }
        ExtractMode::Concat => {
            let mut out = source;
            for other in &node.others {
                out.push_str(&resolve_parameter(other, scope.results)?);
            }
            out
        }
        ExtractMode::RandomInt => extract::random_int(
            node.use_fixed.then_some(node.fixed_value.as_str()),
            node.random_min,
            node.random_max,
        )?,
        ExtractMode::RandomString if node.use_fixed => node.fixed_value.clone(),
        ExtractMode::RandomString => {
            extract::random_string(node.random_string_length, &node.random_string_charset)
        }
    };
    Ok(value)
}

/// A blank literal source falls back to the first incoming result.
fn source_text(node: &ExtractNode, scope: &EvalScope<'_>) -> Result<String, EvalError> {
    let text = resolve_parameter(&node.source, scope.results)?;
    if !text.trim().is_empty() || node.source.referenced_node().is_some() {
        return Ok(text);
    }

    let fallback = scope
        .incoming
        .first()
        .and_then(|c| scope.results.get(&c.source_node_id))
        .filter(|state| !is_skip_like(Some(state), scope.skip_marker))
        .and_then(NodeExecutionState::success_text);
    Ok(fallback.map_or(text, str::to_owned))
}

async fn evaluate_execute(
    node: &Node,
    execute: &ExecuteNode,
    scope: &EvalScope<'_>,
    log: &mut RunLogger,
) -> Evaluation {
    if execute.action_type.trim().is_empty() {
        let err = EvalError::MissingAction(node.label().to_owned());
        log.node_warn(node, err.to_string());
        return Evaluation::Failed(err);
    }

    let parameters = match resolve_action_config(execute, scope) {
        Ok(parameters) => parameters,
        Err(err) => return Evaluation::Failed(err),
    };

    log.node_debug(
        node,
        format!(
            "calling action '{}' with {} parameter(s)",
            execute.action_type,
            parameters.len()
        ),
    );

    match scope.actions.execute(&execute.action_type, &parameters).await {
        Ok(text) => {
            log.node_debug(node, format!("node '{}' succeeded: {text}", node.label()));
            Evaluation::Completed(text)
        }
        Err(err) => Evaluation::Failed(err.into()),
    }
}

fn resolve_action_config(
    execute: &ExecuteNode,
    scope: &EvalScope<'_>,
) -> Result<Vec<ActionParameter>, EvalError> {
    execute
        .action_config
        .iter()
        .map(|(name, value)| {
            resolve_parameter(value, scope.results).map(|v| ActionParameter::new(name.clone(), v))
        })
        .collect()
}
