//! In-memory store implementations for tests and the demo binary.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::model::{Execution, ExecutionStatus, StepLog, StepLogStatus, TriggerType, Workflow};
use crate::store::{ExecutionStore, WorkflowStore};

/// In-memory workflow store.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<Uuid, Workflow>>,
}

impl InMemoryWorkflowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn insert(&self, workflow: &Workflow) -> EngineResult<()> {
        self.workflows
            .write()
            .await
            .insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<Workflow>> {
        Ok(self.workflows.read().await.get(&id).cloned())
    }

    async fn list_by_trigger(&self, trigger_type: TriggerType) -> EngineResult<Vec<Workflow>> {
        Ok(self
            .workflows
            .read()
            .await
            .values()
            .filter(|w| w.trigger.trigger_type == trigger_type)
            .cloned()
            .collect())
    }

    async fn record_run(&self, id: Uuid, success: bool, at: DateTime<Utc>) -> EngineResult<()> {
        // Increment in place under the write lock; callers never
        // read-modify-write.
        if let Some(workflow) = self.workflows.write().await.get_mut(&id) {
            workflow.total_runs += 1;
            if success {
                workflow.successful_runs += 1;
            }
            workflow.last_run_at = Some(at);
        }
        Ok(())
    }
}

/// In-memory execution store.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    executions: RwLock<HashMap<Uuid, Execution>>,
    step_logs: RwLock<Vec<StepLog>>,
}

impl InMemoryExecutionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All executions for a workflow, most recent first.
    pub async fn list_by_workflow(&self, workflow_id: Uuid) -> Vec<Execution> {
        let mut executions: Vec<Execution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        executions
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn insert_execution(&self, execution: &Execution) -> EngineResult<()> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> EngineResult<Option<Execution>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn finish_execution(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        if let Some(execution) = self.executions.write().await.get_mut(&id) {
            // Terminal once reached
            if execution.status.is_terminal() {
                return Ok(());
            }
            execution.status = status;
            execution.error = error;
            execution.completed_at = Some(at);
            execution.heartbeat_at = at;
        }
        Ok(())
    }

    async fn touch_heartbeat(&self, id: Uuid, at: DateTime<Utc>) -> EngineResult<()> {
        if let Some(execution) = self.executions.write().await.get_mut(&id) {
            execution.heartbeat_at = at;
        }
        Ok(())
    }

    async fn insert_step_log(&self, log: &StepLog) -> EngineResult<()> {
        self.step_logs.write().await.push(log.clone());
        Ok(())
    }

    async fn finish_step_log(
        &self,
        id: Uuid,
        status: StepLogStatus,
        output: Option<serde_json::Value>,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        if let Some(log) = self.step_logs.write().await.iter_mut().find(|l| l.id == id) {
            log.status = status;
            log.output = output;
            log.error = error;
            log.completed_at = Some(at);
        }
        Ok(())
    }

    async fn list_step_logs(&self, execution_id: Uuid) -> EngineResult<Vec<StepLog>> {
        let mut logs: Vec<StepLog> = self
            .step_logs
            .read()
            .await
            .iter()
            .filter(|l| l.execution_id == execution_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.step_order);
        Ok(logs)
    }

    async fn list_stale_running(&self, cutoff: DateTime<Utc>) -> EngineResult<Vec<Execution>> {
        Ok(self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.status == ExecutionStatus::Running && e.heartbeat_at < cutoff)
            .cloned()
            .collect())
    }
}
