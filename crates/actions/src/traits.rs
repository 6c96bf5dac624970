//! The `ActionExecutor` trait, the contract every delegated action fulfils.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ActionError;

/// A single resolved `(name, value)` parameter handed to an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    pub value: String,
}

impl ActionParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The external action collaborator.
///
/// Called at most once per `Execute` node per run.  The engine performs no
/// retries, so implementations own any idempotency concerns.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Run `action_type` with the resolved parameters and return its result
    /// text on success.
    async fn execute(
        &self,
        action_type: &str,
        parameters: &[ActionParameter],
    ) -> Result<String, ActionError>;
}
