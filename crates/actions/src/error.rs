//! Action-level error type.

use thiserror::Error;

/// Failure reported by an [`ActionExecutor`](crate::ActionExecutor).
///
/// The engine maps every variant onto a `Failed` node state; the display
/// text becomes the node's error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action ran and reported a failure; the message is kept verbatim.
    #[error("{0}")]
    Failed(String),

    /// The action reported a failure without any message.
    #[error("action failed with an unknown error")]
    Unspecified,

    /// No executor is registered for the requested action type.
    #[error("no action registered for type '{0}'")]
    UnknownAction(String),
}
