//! Error types for the Dripline automation engine.

use thiserror::Error;

use dripline_actions::ActionError;

/// Engine-level errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Workflow not found.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(uuid::Uuid),

    /// Execution not found.
    #[error("Execution not found: {0}")]
    ExecutionNotFound(uuid::Uuid),

    /// Workflow definition failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A step action failed.
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store error (non-database backends).
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<envy::Error> for EngineError {
    fn from(err: envy::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Validation("step orders must be contiguous".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: step orders must be contiguous"
        );
    }

    #[test]
    fn test_action_error_conversion() {
        let err: EngineError = ActionError::MissingConfig("tag".to_string()).into();
        assert!(matches!(err, EngineError::Action(_)));
        assert_eq!(err.to_string(), "Action error: Missing configuration: tag");
    }
}
