//! ADD_TAG and REMOVE_TAG handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::action::StepAction;
use crate::collaborators::SubscriberDirectory;
use crate::context::StepContext;
use crate::error::ActionError;
use crate::registry::ActionHandler;

use super::require_email;

/// Appends a tag to the subscriber's tag set.
pub struct AddTagHandler {
    directory: Arc<dyn SubscriberDirectory>,
}

impl AddTagHandler {
    /// Create a new handler bound to a subscriber directory.
    pub fn new(directory: Arc<dyn SubscriberDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ActionHandler for AddTagHandler {
    fn name(&self) -> &'static str {
        "ADD_TAG"
    }

    async fn execute(
        &self,
        action: &StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        let StepAction::AddTag { tag } = action else {
            return Err(ActionError::UnknownAction(action.kind().to_string()));
        };
        action.validate()?;
        let email = require_email(ctx)?;

        self.directory.add_tag(email, tag).await?;
        tracing::info!(email = %email, tag = %tag, "Tag added");

        Ok(json!({"tag_added": tag}))
    }
}

/// Removes a tag from the subscriber's tag set; no-op when absent.
pub struct RemoveTagHandler {
    directory: Arc<dyn SubscriberDirectory>,
}

impl RemoveTagHandler {
    /// Create a new handler bound to a subscriber directory.
    pub fn new(directory: Arc<dyn SubscriberDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ActionHandler for RemoveTagHandler {
    fn name(&self) -> &'static str {
        "REMOVE_TAG"
    }

    async fn execute(
        &self,
        action: &StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        let StepAction::RemoveTag { tag } = action else {
            return Err(ActionError::UnknownAction(action.kind().to_string()));
        };
        action.validate()?;
        let email = require_email(ctx)?;

        self.directory.remove_tag(email, tag).await?;
        tracing::info!(email = %email, tag = %tag, "Tag removed");

        Ok(json!({"tag_removed": tag}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemorySubscriberDirectory;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_then_remove_tag() {
        let directory = Arc::new(InMemorySubscriberDirectory::new());
        let add = AddTagHandler::new(directory.clone());
        let remove = RemoveTagHandler::new(directory.clone());
        let ctx = StepContext::from_payload(&json!({"email": "s@x.com"}));

        let action = StepAction::AddTag {
            tag: "new-enrollee".to_string(),
        };
        let output = add.execute(&action, &ctx).await.unwrap();
        assert_eq!(output["tag_added"], "new-enrollee");
        assert_eq!(directory.tags("s@x.com").await, vec!["new-enrollee"]);

        let action = StepAction::RemoveTag {
            tag: "new-enrollee".to_string(),
        };
        remove.execute(&action, &ctx).await.unwrap();
        assert!(directory.tags("s@x.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_tag_is_noop() {
        let directory = Arc::new(InMemorySubscriberDirectory::new());
        let remove = RemoveTagHandler::new(directory);
        let ctx = StepContext::from_payload(&json!({"email": "s@x.com"}));

        let action = StepAction::RemoveTag {
            tag: "ghost".to_string(),
        };
        assert!(remove.execute(&action, &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_email_fails() {
        let directory = Arc::new(InMemorySubscriberDirectory::new());
        let add = AddTagHandler::new(directory);
        let ctx = StepContext::new();

        let action = StepAction::AddTag {
            tag: "vip".to_string(),
        };
        let result = add.execute(&action, &ctx).await;
        assert!(matches!(result, Err(ActionError::MissingContext(_))));
    }

    #[tokio::test]
    async fn test_empty_tag_fails() {
        let directory = Arc::new(InMemorySubscriberDirectory::new());
        let add = AddTagHandler::new(directory.clone());
        let ctx = StepContext::from_payload(&json!({"email": "s@x.com"}));

        let action = StepAction::AddTag { tag: String::new() };
        let result = add.execute(&action, &ctx).await;
        assert!(matches!(result, Err(ActionError::MissingConfig(_))));
        assert!(directory.tags("s@x.com").await.is_empty());
    }
}
