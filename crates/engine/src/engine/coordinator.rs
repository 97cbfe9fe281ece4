//! Execution coordination.
//!
//! Owns one workflow run: persists the RUNNING execution record, runs the
//! step sequence strictly in order on its own task, finalizes the terminal
//! status and updates the workflow's run counters.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use dripline_actions::StepContext;

use crate::engine::runner::StepRunner;
use crate::error::EngineResult;
use crate::model::{Execution, ExecutionStatus, Workflow};
use crate::store::{ExecutionStore, WorkflowStore};

/// Coordinates the lifecycle of workflow executions.
#[derive(Clone)]
pub struct ExecutionCoordinator {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    runner: StepRunner,
}

impl ExecutionCoordinator {
    /// Create a new coordinator.
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        runner: StepRunner,
    ) -> Self {
        Self {
            workflows,
            executions,
            runner,
        }
    }

    /// Start an execution for a workflow and payload.
    ///
    /// Returns the execution id as soon as the RUNNING record is
    /// persisted; the step sequence runs on its own task and does not
    /// block the caller.
    pub async fn start(&self, workflow: Workflow, payload: serde_json::Value) -> EngineResult<Uuid> {
        let execution = Execution::start(workflow.id, payload);
        let execution_id = execution.id;
        self.executions.insert_execution(&execution).await?;

        tracing::info!(
            execution_id = %execution_id,
            workflow_id = %workflow.id,
            workflow = %workflow.name,
            "Execution started"
        );

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_to_completion(workflow, execution).await;
        });

        Ok(execution_id)
    }

    /// Run the step sequence and finalize the execution.
    async fn run_to_completion(&self, workflow: Workflow, execution: Execution) {
        let mut ctx = StepContext::from_payload(&execution.payload);

        for step in workflow.steps_in_order() {
            // Liveness signal between steps so a restarted engine can
            // tell an in-flight execution from an abandoned one.
            if let Err(e) = self.executions.touch_heartbeat(execution.id, Utc::now()).await {
                tracing::warn!(execution_id = %execution.id, error = %e, "Heartbeat update failed");
            }

            match self.runner.run_step(execution.id, step, &ctx).await {
                Ok(output) => {
                    // Later steps may reference earlier outputs by name.
                    ctx.merge_object(&output);
                }
                Err(e) => {
                    self.finalize(&workflow, execution.id, ExecutionStatus::Failed, Some(e.to_string()))
                        .await;
                    return;
                }
            }
        }

        self.finalize(&workflow, execution.id, ExecutionStatus::Completed, None)
            .await;
    }

    /// Move the execution to a terminal status and record the run.
    async fn finalize(
        &self,
        workflow: &Workflow,
        execution_id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
    ) {
        let now = Utc::now();
        let success = status == ExecutionStatus::Completed;

        if let Err(e) = self
            .executions
            .finish_execution(execution_id, status, error.clone(), now)
            .await
        {
            tracing::error!(execution_id = %execution_id, error = %e, "Failed to finalize execution");
        }

        if let Err(e) = self.workflows.record_run(workflow.id, success, now).await {
            tracing::error!(workflow_id = %workflow.id, error = %e, "Failed to record workflow run");
        }

        match &error {
            None => tracing::info!(
                execution_id = %execution_id,
                workflow_id = %workflow.id,
                "Execution completed"
            ),
            Some(message) => tracing::warn!(
                execution_id = %execution_id,
                workflow_id = %workflow.id,
                error = %message,
                "Execution failed"
            ),
        }
    }
}
