//! CONDITION handler.

use async_trait::async_trait;
use serde_json::json;

use crate::action::StepAction;
use crate::context::StepContext;
use crate::error::ActionError;
use crate::evaluator::ConditionEvaluator;
use crate::registry::ActionHandler;

/// Evaluates a condition expression against the context.
///
/// A false (or malformed) condition is not a failure: the outcome is
/// recorded in the step output as `condition_matched` and the execution
/// continues to the next step regardless.
#[derive(Default)]
pub struct ConditionHandler {
    evaluator: ConditionEvaluator,
}

impl ConditionHandler {
    /// Create a new condition handler.
    pub fn new() -> Self {
        Self {
            evaluator: ConditionEvaluator::new(),
        }
    }
}

#[async_trait]
impl ActionHandler for ConditionHandler {
    fn name(&self) -> &'static str {
        "CONDITION"
    }

    async fn execute(
        &self,
        action: &StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        let StepAction::Condition { expression } = action else {
            return Err(ActionError::UnknownAction(action.kind().to_string()));
        };

        let matched = self.evaluator.evaluate(expression, ctx);
        tracing::debug!(expression = %expression, matched = %matched, "Condition evaluated");

        Ok(json!({"condition_matched": matched}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_condition_outcome_is_output_not_error() {
        let handler = ConditionHandler::new();
        let ctx = StepContext::from_payload(&json!({"email": "a@gmail.com"}));

        let action = StepAction::Condition {
            expression: "email contains '@gmail.com'".to_string(),
        };
        let output = handler.execute(&action, &ctx).await.unwrap();
        assert_eq!(output["condition_matched"], true);

        let action = StepAction::Condition {
            expression: "email contains '@yahoo.com'".to_string(),
        };
        let output = handler.execute(&action, &ctx).await.unwrap();
        assert_eq!(output["condition_matched"], false);
    }

    #[tokio::test]
    async fn test_malformed_expression_is_false_not_error() {
        let handler = ConditionHandler::new();
        let ctx = StepContext::new();

        let action = StepAction::Condition {
            expression: "garbage".to_string(),
        };
        let output = handler.execute(&action, &ctx).await.unwrap();
        assert_eq!(output["condition_matched"], false);
    }
}
