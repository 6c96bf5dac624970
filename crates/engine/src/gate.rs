//! Edge gating: decides whether a dequeued node may run.

use std::collections::HashMap;

use regex::Regex;

use crate::{
    models::{Connection, Node},
    state::NodeExecutionState,
};

const ERROR_TOKENS: [&str; 3] = ["error", "failed", "on_error"];
const SUCCESS_TOKENS: [&str; 3] = ["success", "ok", "on_success"];

/// Boolean-like parse: `true/1/yes/y/on`, `false/0/no/n/off`, case-insensitive.
pub fn parse_bool_like(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// `true` if the condition routes failures (`error`, `failed`, `on_error`).
pub fn is_error_condition(condition: Option<&str>) -> bool {
    let normalized = condition.unwrap_or_default().trim().to_lowercase();
    ERROR_TOKENS.contains(&normalized.as_str())
}

/// Skipped, or a success whose text is the configured skip marker.
pub fn is_skip_like(state: Option<&NodeExecutionState>, skip_marker: &str) -> bool {
    match state {
        Some(NodeExecutionState::Skipped(_)) => true,
        Some(NodeExecutionState::Success(text)) => text == skip_marker,
        _ => false,
    }
}

/// Everything gating needs to read about the run so far.
pub struct GateView<'a> {
    pub nodes: &'a HashMap<&'a str, &'a Node>,
    pub results: &'a HashMap<String, NodeExecutionState>,
    pub skip_marker: &'a str,
}

impl GateView<'_> {
    /// A node with no qualifying incoming connection always runs; otherwise
    /// at least one connection must be satisfied.
    pub fn should_execute(&self, incoming: &[&Connection]) -> bool {
        incoming.is_empty() || incoming.iter().any(|c| self.is_satisfied(c))
    }

    pub fn is_satisfied(&self, connection: &Connection) -> bool {
        let source_id = connection.source_node_id.as_str();
        let state = self.results.get(source_id);
        if is_skip_like(state, self.skip_marker) {
            return false;
        }

        let raw = connection.condition.as_deref().unwrap_or_default().trim();
        let source_is_boolean = self.nodes.get(source_id).is_some_and(|n| n.is_boolean());
        let condition = if raw.is_empty() && source_is_boolean {
            "true"
        } else {
            raw
        };

        let key = condition.to_lowercase();
        if ERROR_TOKENS.contains(&key.as_str()) {
            return state.is_some_and(NodeExecutionState::is_failed);
        }
        if SUCCESS_TOKENS.contains(&key.as_str()) || condition.is_empty() {
            return state.is_some_and(NodeExecutionState::is_success);
        }

        let Some(text) = state.and_then(NodeExecutionState::success_text) else {
            return false;
        };

        match key.as_str() {
            // Unparsable text counts as false.
            "true" => parse_bool_like(text).unwrap_or(false),
            "false" => !parse_bool_like(text).unwrap_or(false),
            _ => Regex::new(condition).is_ok_and(|re| re.is_match(text)),
        }
    }
}
