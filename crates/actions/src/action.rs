//! Step action model.
//!
//! One strongly-typed configuration per step kind, tagged by `type`.
//! Configuration is validated when a workflow is saved and re-checked
//! defensively by the handlers at execution time.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// The action a step performs, with its per-kind configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepAction {
    /// Send an email to the subscriber (or an explicit recipient).
    SendEmail {
        subject: String,
        body: String,
        /// Recipient override; defaults to the context's `email` field.
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
    },
    /// Append a tag to the subscriber's tag set.
    AddTag { tag: String },
    /// Remove a tag from the subscriber's tag set.
    RemoveTag { tag: String },
    /// Idempotently enroll the subscriber in a course.
    EnrollInCourse { course_id: String },
    /// Pure pass-through marker; the delay is applied by the step runner.
    Wait,
    /// Evaluate a condition expression against the context.
    Condition { expression: String },
}

impl StepAction {
    /// The registry kind for this action.
    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::SendEmail { .. } => "SEND_EMAIL",
            StepAction::AddTag { .. } => "ADD_TAG",
            StepAction::RemoveTag { .. } => "REMOVE_TAG",
            StepAction::EnrollInCourse { .. } => "ENROLL_IN_COURSE",
            StepAction::Wait => "WAIT",
            StepAction::Condition { .. } => "CONDITION",
        }
    }

    /// Validate the configuration for this action kind.
    ///
    /// Called at workflow-authoring time; handlers re-check at run time.
    pub fn validate(&self) -> Result<(), ActionError> {
        match self {
            StepAction::SendEmail { subject, body, .. } => {
                if subject.trim().is_empty() {
                    return Err(ActionError::MissingConfig("subject".to_string()));
                }
                if body.trim().is_empty() {
                    return Err(ActionError::MissingConfig("body".to_string()));
                }
                Ok(())
            }
            StepAction::AddTag { tag } | StepAction::RemoveTag { tag } => {
                if tag.trim().is_empty() {
                    return Err(ActionError::MissingConfig("tag".to_string()));
                }
                Ok(())
            }
            StepAction::EnrollInCourse { course_id } => {
                if course_id.trim().is_empty() {
                    return Err(ActionError::MissingConfig("course_id".to_string()));
                }
                Ok(())
            }
            // A malformed expression evaluates to false at run time,
            // it is not a validation failure.
            StepAction::Wait | StepAction::Condition { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let action = StepAction::AddTag {
            tag: "vip".to_string(),
        };
        assert_eq!(action.kind(), "ADD_TAG");
        assert_eq!(StepAction::Wait.kind(), "WAIT");
    }

    #[test]
    fn test_serialization_tag() {
        let action = StepAction::SendEmail {
            subject: "Welcome".to_string(),
            body: "Hello".to_string(),
            to: None,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"type\":\"SEND_EMAIL\""));
        assert!(!json.contains("\"to\""));

        let parsed: StepAction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_validate_rejects_empty_config() {
        let action = StepAction::AddTag {
            tag: "  ".to_string(),
        };
        assert!(matches!(
            action.validate(),
            Err(ActionError::MissingConfig(field)) if field == "tag"
        ));

        let action = StepAction::EnrollInCourse {
            course_id: String::new(),
        };
        assert!(action.validate().is_err());

        let action = StepAction::SendEmail {
            subject: "Hi".to_string(),
            body: String::new(),
            to: None,
        };
        assert!(action.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_wait_and_condition() {
        assert!(StepAction::Wait.validate().is_ok());
        let action = StepAction::Condition {
            expression: "anything at all".to_string(),
        };
        assert!(action.validate().is_ok());
    }
}
