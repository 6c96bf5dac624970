//! Built-in actions that need no external system.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{ActionError, ActionExecutor, ActionParameter};

/// Returns its parameters as a JSON object text.
///
/// Later parameters with the same name overwrite earlier ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoAction;

#[async_trait]
impl ActionExecutor for EchoAction {
    async fn execute(
        &self,
        _action_type: &str,
        parameters: &[ActionParameter],
    ) -> Result<String, ActionError> {
        let object: Map<String, Value> = parameters
            .iter()
            .map(|p| (p.name.clone(), Value::String(p.value.clone())))
            .collect();
        Ok(Value::Object(object).to_string())
    }
}
