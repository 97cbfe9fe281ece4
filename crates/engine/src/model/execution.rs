//! Execution and step log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::status::{ExecutionStatus, StepLogStatus};

/// One run instance of a workflow, created per matched trigger event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Execution identifier.
    pub id: Uuid,
    /// The workflow this execution runs.
    pub workflow_id: Uuid,
    /// Current status; Running -> Completed | Failed, terminal once reached.
    pub status: ExecutionStatus,
    /// Trigger payload, frozen at creation.
    pub payload: serde_json::Value,
    /// Subscriber email associated with the execution, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_email: Option<String>,
    /// When the execution was created.
    pub started_at: DateTime<Utc>,
    /// When the execution reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Last liveness signal from the owning coordinator.
    pub heartbeat_at: DateTime<Utc>,
    /// Error message if the execution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Execution {
    /// Create a new RUNNING execution for a workflow and payload.
    pub fn start(workflow_id: Uuid, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        let subscriber_email = payload
            .get("email")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            status: ExecutionStatus::Running,
            payload,
            subscriber_email,
            started_at: now,
            completed_at: None,
            heartbeat_at: now,
            error: None,
        }
    }
}

/// Append-only record of one step's attempt within an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLog {
    /// Log record identifier.
    pub id: Uuid,
    /// Owning execution.
    pub execution_id: Uuid,
    /// The step definition this attempt ran.
    pub step_id: Uuid,
    /// The step's position, for ordering queries.
    pub step_order: i32,
    /// Current status of the attempt.
    pub status: StepLogStatus,
    /// Context snapshot at dispatch time.
    pub input: serde_json::Value,
    /// Handler output on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
    /// When the attempt reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepLog {
    /// Create a new RUNNING step log with the current context as input.
    pub fn start(execution_id: Uuid, step_id: Uuid, step_order: i32, input: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            step_id,
            step_order,
            status: StepLogStatus::Running,
            input,
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}
