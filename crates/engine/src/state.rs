//! Per-node execution state and the result of a whole run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logger::RunLogEntry;

/// Reason recorded when no incoming gate of a node was satisfied.
pub const SKIP_CONDITION_NOT_MET: &str = "condition not met";
/// Reason recorded for node kinds the engine does not evaluate.
pub const SKIP_NON_EXECUTE_NODE: &str = "non-execute node";

/// Lifecycle of one node in one run: `Pending -> Running -> terminal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum NodeExecutionState {
    Pending,
    Running,
    Success(String),
    Skipped(String),
    Failed(String),
}

impl NodeExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Skipped(_) | Self::Failed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The result text of a successful node.
    pub fn success_text(&self) -> Option<&str> {
        match self {
            Self::Success(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success(_) => write!(f, "success"),
            Self::Skipped(_) => write!(f, "skipped"),
            Self::Failed(_) => write!(f, "failed"),
        }
    }
}

/// Everything a caller learns about one run; intended for persistence by an
/// external repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub run_id: Uuid,
    pub workflow_id: String,
    pub workflow_name: String,
    /// The explicitly requested trigger, `None` for manual runs.
    pub trigger_node_id: Option<String>,
    pub success: bool,
    pub node_results: HashMap<String, NodeExecutionState>,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub log: Vec<RunLogEntry>,
}

impl ExecutionResult {
    pub fn state(&self, node_id: &str) -> Option<&NodeExecutionState> {
        self.node_results.get(node_id)
    }
}
