//! Routes an `actionType` to the executor registered for it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{ActionError, ActionExecutor, ActionParameter};

/// Maps action type strings to boxed `ActionExecutor` implementations.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` for `action_type`, replacing any previous entry.
    pub fn register(
        &mut self,
        action_type: impl Into<String>,
        executor: Arc<dyn ActionExecutor>,
    ) -> &mut Self {
        self.executors.insert(action_type.into(), executor);
        self
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.executors.contains_key(action_type)
    }
}

#[async_trait]
impl ActionExecutor for ActionRegistry {
    async fn execute(
        &self,
        action_type: &str,
        parameters: &[ActionParameter],
    ) -> Result<String, ActionError> {
        let executor = self
            .executors
            .get(action_type)
            .ok_or_else(|| ActionError::UnknownAction(action_type.to_owned()))?;

        debug!(action_type, parameters = parameters.len(), "dispatching action");
        executor.execute(action_type, parameters).await
    }
}
