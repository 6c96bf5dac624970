//! `MockAction`: a test double for `ActionExecutor`.
//!
//! Useful in unit and integration tests where a real action is either
//! unavailable or irrelevant.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{ActionError, ActionExecutor, ActionParameter};

/// Behaviour injected into `MockAction` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Succeed with the given result text.
    Return(String),
    /// Fail with the given message.
    Fail(String),
    /// Fail without a message.
    FailSilently,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub action_type: String,
    pub parameters: Vec<ActionParameter>,
}

/// A mock action that records every call it receives and returns a
/// programmer-specified result.
#[derive(Debug, Clone)]
pub struct MockAction {
    pub behaviour: MockBehaviour,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockAction {
    fn with(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::default(),
        }
    }

    /// Create a mock that always succeeds with `text`.
    pub fn returning(text: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Return(text.into()))
    }

    /// Create a mock that always fails with `msg`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Fail(msg.into()))
    }

    /// Create a mock that fails without an error message.
    pub fn failing_silently() -> Self {
        Self::with(MockBehaviour::FailSilently)
    }

    /// Number of times this action has been executed.
    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    /// All calls seen so far, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ActionExecutor for MockAction {
    async fn execute(
        &self,
        action_type: &str,
        parameters: &[ActionParameter],
    ) -> Result<String, ActionError> {
        self.lock().push(RecordedCall {
            action_type: action_type.to_owned(),
            parameters: parameters.to_vec(),
        });

        match &self.behaviour {
            MockBehaviour::Return(text) => Ok(text.clone()),
            MockBehaviour::Fail(msg) => Err(ActionError::Failed(msg.clone())),
            MockBehaviour::FailSilently => Err(ActionError::Unspecified),
        }
    }
}
