//! WAIT handler.

use async_trait::async_trait;
use serde_json::json;

use crate::action::StepAction;
use crate::context::StepContext;
use crate::error::ActionError;
use crate::registry::ActionHandler;

/// Pure pass-through marker.
///
/// The step's delay is applied by the step runner before dispatch; by the
/// time this handler runs the wait has already elapsed.
#[derive(Default)]
pub struct WaitHandler;

impl WaitHandler {
    /// Create a new wait handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for WaitHandler {
    fn name(&self) -> &'static str {
        "WAIT"
    }

    async fn execute(
        &self,
        action: &StepAction,
        _ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        if !matches!(action, StepAction::Wait) {
            return Err(ActionError::UnknownAction(action.kind().to_string()));
        }
        Ok(json!({"waited": true}))
    }
}
