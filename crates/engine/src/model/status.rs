//! Status enums for workflows, executions and step logs.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Workflow is live and eligible for trigger matching.
    Active,
    /// Workflow is paused by its owner.
    Paused,
    /// Workflow is archived.
    Archived,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl From<&str> for WorkflowStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "paused" => Self::Paused,
            "archived" => Self::Archived,
            _ => Self::Active,
        }
    }
}

/// Status of one workflow execution.
///
/// Transitions are monotonic: Running -> Completed or Running -> Failed,
/// terminal once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Execution is in progress.
    Running,
    /// All steps completed without failure.
    Completed,
    /// A step failed and halted the execution.
    Failed,
}

impl ExecutionStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<&str> for ExecutionStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "completed" | "success" => Self::Completed,
            "failed" | "error" => Self::Failed,
            _ => Self::Running,
        }
    }
}

/// Status of one step attempt within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLogStatus {
    /// Step attempt is in progress.
    Running,
    /// Step attempt completed successfully.
    Completed,
    /// Step attempt failed.
    Failed,
}

impl std::fmt::Display for StepLogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<&str> for StepLogStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "completed" | "success" => Self::Completed,
            "failed" | "error" => Self::Failed,
            _ => Self::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trip() {
        assert_eq!(WorkflowStatus::Active.to_string(), "active");
        assert_eq!(WorkflowStatus::from("PAUSED"), WorkflowStatus::Paused);
        assert_eq!(ExecutionStatus::Running.to_string(), "running");
        assert_eq!(ExecutionStatus::from("FAILED"), ExecutionStatus::Failed);
        assert_eq!(StepLogStatus::from("completed"), StepLogStatus::Completed);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&ExecutionStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }
}
