//! Engine-level error types.

use thiserror::Error;

use actions::ActionError;

/// Errors that reject a workflow as a whole (validation + structural).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// A connection or parameter references a node ID that doesn't exist.
    #[error("reference to unknown node '{node_id}' ({side})")]
    UnknownNodeReference {
        node_id: String,
        side: &'static str,
    },

    // ------ Structural errors (abort a run before scheduling) ------

    #[error("workflow has no trigger node, cannot execute")]
    NoTriggerNode,

    #[error("specified trigger node does not exist: {0}")]
    TriggerNotFound(String),

    #[error("workflow has no manual trigger node")]
    NoManualTrigger,

    /// The combined dependency graph is not acyclic.
    #[error("workflow has circular dependencies, cannot execute")]
    CycleDetected,
}

/// Errors local to one node; each surfaces as that node's `Failed` state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("referenced node '{0}' failed")]
    ReferencedNodeFailed(String),

    #[error("referenced node '{0}' has not completed")]
    ReferencedNodeNotCompleted(String),

    #[error("type mismatch: cannot compare '{left}' with '{right}'")]
    TypeMismatch { left: String, right: String },

    #[error("list mixes numeric and non-numeric items: {0}")]
    InListTypeMismatch(String),

    #[error("fixed value must be an integer: '{0}'")]
    InvalidFixedValue(String),

    /// `Execute` node with a blank `action_type`.
    #[error("node '{0}' has no action configured")]
    MissingAction(String),

    #[error(transparent)]
    Action(#[from] ActionError),
}
