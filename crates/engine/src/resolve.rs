//! Parameter resolution: literal text, or the recorded result of another node.

use std::collections::HashMap;

use crate::{error::EvalError, models::ParameterValue, state::NodeExecutionState};

/// Resolve `value` against the results recorded so far in this run.
///
/// A skipped node resolves to its skip reason, which downstream nodes may
/// read like any other text.
pub fn resolve_parameter(
    value: &ParameterValue,
    results: &HashMap<String, NodeExecutionState>,
) -> Result<String, EvalError> {
    let node_id = match value {
        ParameterValue::Static(text) => return Ok(text.clone()),
        ParameterValue::Reference(node_id) => node_id,
    };

    match results.get(node_id) {
        Some(NodeExecutionState::Success(text)) => Ok(text.clone()),
        Some(NodeExecutionState::Skipped(reason)) => Ok(reason.clone()),
        Some(NodeExecutionState::Failed(_)) => {
            Err(EvalError::ReferencedNodeFailed(node_id.clone()))
        }
        Some(NodeExecutionState::Pending | NodeExecutionState::Running) | None => {
            Err(EvalError::ReferencedNodeNotCompleted(node_id.clone()))
        }
    }
}
