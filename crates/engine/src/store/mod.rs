//! Persistence traits for workflows, executions and step logs.
//!
//! Two implementations are provided: in-memory (tests, demo) and
//! Postgres. Executions and StepLogs are owned exclusively by the
//! coordinator that created them; workflow run counters are mutated only
//! through `record_run`.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryExecutionStore, InMemoryWorkflowStore};
pub use postgres::{PgExecutionStore, PgWorkflowStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::model::{Execution, ExecutionStatus, StepLog, StepLogStatus, TriggerType, Workflow};

/// Read-mostly store for workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Insert a workflow definition.
    async fn insert(&self, workflow: &Workflow) -> EngineResult<()>;

    /// Get a workflow by id.
    async fn get(&self, id: Uuid) -> EngineResult<Option<Workflow>>;

    /// List all workflows subscribed to a trigger type.
    ///
    /// Returns workflows regardless of enabled/status; the matcher applies
    /// the enabled + Active guard.
    async fn list_by_trigger(&self, trigger_type: TriggerType) -> EngineResult<Vec<Workflow>>;

    /// Record one completed run against the workflow's counters.
    ///
    /// Contract: the increment is atomic (a relative update, never
    /// read-modify-write by callers), since executions of the same
    /// workflow complete concurrently. Increments `total_runs` always and
    /// `successful_runs` only when `success` is true; stamps `last_run_at`.
    async fn record_run(&self, id: Uuid, success: bool, at: DateTime<Utc>) -> EngineResult<()>;
}

/// Append-heavy store for executions and their step logs.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a new RUNNING execution.
    async fn insert_execution(&self, execution: &Execution) -> EngineResult<()>;

    /// Get an execution by id.
    async fn get_execution(&self, id: Uuid) -> EngineResult<Option<Execution>>;

    /// Move an execution to a terminal status.
    ///
    /// A no-op when the execution is already terminal: status transitions
    /// are monotonic and terminal once reached.
    async fn finish_execution(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> EngineResult<()>;

    /// Update the execution's liveness heartbeat.
    async fn touch_heartbeat(&self, id: Uuid, at: DateTime<Utc>) -> EngineResult<()>;

    /// Append a new RUNNING step log.
    async fn insert_step_log(&self, log: &StepLog) -> EngineResult<()>;

    /// Move a step log to a terminal status with its output or error.
    async fn finish_step_log(
        &self,
        id: Uuid,
        status: StepLogStatus,
        output: Option<serde_json::Value>,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> EngineResult<()>;

    /// List an execution's step logs ordered by step order.
    async fn list_step_logs(&self, execution_id: Uuid) -> EngineResult<Vec<StepLog>>;

    /// List RUNNING executions whose heartbeat is older than the cutoff.
    async fn list_stale_running(&self, cutoff: DateTime<Utc>) -> EngineResult<Vec<Execution>>;
}
