//! SEND_EMAIL handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::action::StepAction;
use crate::collaborators::EmailSender;
use crate::context::StepContext;
use crate::error::ActionError;
use crate::registry::ActionHandler;

use super::require_email;

/// Dispatches an email via the mail collaborator.
///
/// The recipient is the configured override when present, otherwise the
/// context's `email` field. Missing both is a configuration failure.
pub struct SendEmailHandler {
    sender: Arc<dyn EmailSender>,
}

impl SendEmailHandler {
    /// Create a new handler bound to an email sender.
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ActionHandler for SendEmailHandler {
    fn name(&self) -> &'static str {
        "SEND_EMAIL"
    }

    async fn execute(
        &self,
        action: &StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        let StepAction::SendEmail { subject, body, to } = action else {
            return Err(ActionError::UnknownAction(action.kind().to_string()));
        };
        action.validate()?;

        let recipient = match to.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(override_to) => override_to,
            None => require_email(ctx)?,
        };

        self.sender.send_email(recipient, subject, body).await?;

        tracing::info!(to = %recipient, subject = %subject, "Email dispatched");

        Ok(json!({
            "email_sent_to": recipient,
            "email_subject": subject,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemoryEmailSender;
    use serde_json::json;

    fn send_email_action() -> StepAction {
        StepAction::SendEmail {
            subject: "Welcome".to_string(),
            body: "Hello there".to_string(),
            to: None,
        }
    }

    #[tokio::test]
    async fn test_sends_to_context_email() {
        let sender = Arc::new(InMemoryEmailSender::new());
        let handler = SendEmailHandler::new(sender.clone());
        let ctx = StepContext::from_payload(&json!({"email": "s@x.com"}));

        let output = handler.execute(&send_email_action(), &ctx).await.unwrap();
        assert_eq!(output["email_sent_to"], "s@x.com");

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "s@x.com");
        assert_eq!(sent[0].subject, "Welcome");
    }

    #[tokio::test]
    async fn test_recipient_override_wins() {
        let sender = Arc::new(InMemoryEmailSender::new());
        let handler = SendEmailHandler::new(sender.clone());
        let ctx = StepContext::from_payload(&json!({"email": "s@x.com"}));

        let action = StepAction::SendEmail {
            subject: "Ops".to_string(),
            body: "Alert".to_string(),
            to: Some("ops@x.com".to_string()),
        };
        handler.execute(&action, &ctx).await.unwrap();
        assert_eq!(sender.sent().await[0].to, "ops@x.com");
    }

    #[tokio::test]
    async fn test_missing_recipient_fails() {
        let sender = Arc::new(InMemoryEmailSender::new());
        let handler = SendEmailHandler::new(sender.clone());
        let ctx = StepContext::new();

        let result = handler.execute(&send_email_action(), &ctx).await;
        assert!(matches!(result, Err(ActionError::MissingContext(_))));
        assert!(sender.sent().await.is_empty());
    }
}
