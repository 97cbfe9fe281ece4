//! Action execution error types.

use thiserror::Error;

/// Errors that can occur while executing a step action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A required configuration field is missing or empty.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// A required context field is missing (e.g. no subscriber email).
    #[error("Missing context field: {0}")]
    MissingContext(String),

    /// A collaborator call failed (email provider, subscriber store, ...).
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// No handler is registered for the step kind.
    #[error("Unknown action kind: {0}")]
    UnknownAction(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl ActionError {
    /// Whether the failure is transient and worth retrying.
    ///
    /// Collaborator failures (provider outage, store unavailable) are
    /// transient; configuration and context failures are permanent and
    /// retrying them cannot succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ActionError::Collaborator(_))
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        ActionError::Json(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ActionError::MissingConfig("tag".to_string());
        assert_eq!(err.to_string(), "Missing configuration: tag");

        let err = ActionError::UnknownAction("NOOP".to_string());
        assert_eq!(err.to_string(), "Unknown action kind: NOOP");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ActionError::Collaborator("smtp down".to_string()).is_transient());
        assert!(!ActionError::MissingConfig("tag".to_string()).is_transient());
        assert!(!ActionError::MissingContext("email".to_string()).is_transient());
    }
}
