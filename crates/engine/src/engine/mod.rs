//! Workflow engine core.
//!
//! The engine reacts to business events: when an event arrives it finds
//! every enabled, Active workflow subscribed to the event's trigger type
//! whose filters match the payload, and starts one execution per match.
//! Triggering is fire-and-forget: the event producer is never blocked on
//! or failed by workflow execution.

pub mod coordinator;
pub mod delay;
pub mod matcher;
pub mod recovery;
pub mod runner;

pub use coordinator::ExecutionCoordinator;
pub use runner::StepRunner;

use std::sync::Arc;

use uuid::Uuid;

use dripline_actions::ActionRegistry;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::model::{TriggerType, Workflow};
use crate::store::{ExecutionStore, WorkflowStore};

/// The workflow engine facade.
///
/// Owns the stores, the action registry and the coordinator; exposes
/// event triggering, direct execution start and startup recovery.
#[derive(Clone)]
pub struct AutomationEngine {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    coordinator: ExecutionCoordinator,
    config: EngineConfig,
}

impl AutomationEngine {
    /// Assemble the engine from its stores and action registry.
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        registry: Arc<ActionRegistry>,
        config: EngineConfig,
    ) -> Self {
        let runner = StepRunner::new(executions.clone(), registry, config.clone());
        let coordinator = ExecutionCoordinator::new(workflows.clone(), executions.clone(), runner);
        Self {
            workflows,
            executions,
            coordinator,
            config,
        }
    }

    /// React to a business event.
    ///
    /// Starts one execution for every matching workflow and returns their
    /// execution ids. Fire-and-forget with per-workflow isolation: a
    /// workflow that fails to start is logged and skipped, it never stops
    /// the other matches and never surfaces to the event producer.
    pub async fn trigger_workflows(
        &self,
        trigger_type: TriggerType,
        payload: serde_json::Value,
    ) -> Vec<Uuid> {
        let candidates = match self.workflows.list_by_trigger(trigger_type).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(trigger = %trigger_type, error = %e, "Workflow lookup failed");
                return Vec::new();
            }
        };

        let mut started = Vec::new();
        for workflow in candidates {
            if !matcher::workflow_matches(&workflow, trigger_type, &payload) {
                continue;
            }
            let workflow_id = workflow.id;
            match self.coordinator.start(workflow, payload.clone()).await {
                Ok(execution_id) => started.push(execution_id),
                Err(e) => {
                    tracing::error!(
                        workflow_id = %workflow_id,
                        trigger = %trigger_type,
                        error = %e,
                        "Failed to start execution"
                    );
                }
            }
        }

        tracing::info!(
            trigger = %trigger_type,
            matched = started.len(),
            "Trigger processed"
        );
        started
    }

    /// Start an execution for a specific workflow, bypassing trigger matching.
    pub async fn start_execution(
        &self,
        workflow: Workflow,
        payload: serde_json::Value,
    ) -> EngineResult<Uuid> {
        self.coordinator.start(workflow, payload).await
    }

    /// Reconcile executions abandoned by a previous engine process.
    pub async fn reconcile_abandoned(&self) -> EngineResult<usize> {
        recovery::reconcile_abandoned(&self.executions, self.config.abandoned_after()).await
    }

    /// The workflow store backing this engine.
    pub fn workflows(&self) -> &Arc<dyn WorkflowStore> {
        &self.workflows
    }

    /// The execution store backing this engine.
    pub fn executions(&self) -> &Arc<dyn ExecutionStore> {
        &self.executions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DelayUnit, ExecutionStatus, FilterOp, FilterRule, Step, StepLogStatus, Trigger,
    };
    use crate::store::{InMemoryExecutionStore, InMemoryWorkflowStore};
    use dripline_actions::collaborators::{
        InMemoryEmailSender, InMemorySubscriberDirectory,
    };
    use dripline_actions::{Collaborators, StepAction};
    use serde_json::json;

    struct Harness {
        engine: AutomationEngine,
        workflows: Arc<InMemoryWorkflowStore>,
        executions: Arc<InMemoryExecutionStore>,
        email: Arc<InMemoryEmailSender>,
        subscribers: Arc<InMemorySubscriberDirectory>,
    }

    fn harness() -> Harness {
        let workflows = Arc::new(InMemoryWorkflowStore::new());
        let executions = Arc::new(InMemoryExecutionStore::new());
        let (collaborators, email, subscribers, _enrollments) = Collaborators::in_memory();
        let registry = Arc::new(ActionRegistry::with_builtin_handlers(collaborators));
        let engine = AutomationEngine::new(
            workflows.clone(),
            executions.clone(),
            registry,
            EngineConfig::default(),
        );
        Harness {
            engine,
            workflows,
            executions,
            email,
            subscribers,
        }
    }

    async fn wait_for_terminal(
        store: &InMemoryExecutionStore,
        id: Uuid,
    ) -> crate::model::Execution {
        loop {
            let execution = store.get_execution(id).await.unwrap().unwrap();
            if execution.status.is_terminal() {
                return execution;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_starts_one_execution_per_matching_workflow() {
        let h = harness();

        let matching = Workflow::new(
            Uuid::new_v4(),
            "welcome",
            Trigger::on(TriggerType::NewCourseEnrollment),
            vec![Step::new(0, StepAction::AddTag { tag: "enrolled".to_string() })],
        );
        let other_trigger = Workflow::new(
            Uuid::new_v4(),
            "after purchase",
            Trigger::on(TriggerType::ProductPurchased),
            vec![Step::new(0, StepAction::AddTag { tag: "buyer".to_string() })],
        );
        let mut disabled = Workflow::new(
            Uuid::new_v4(),
            "disabled",
            Trigger::on(TriggerType::NewCourseEnrollment),
            vec![Step::new(0, StepAction::AddTag { tag: "never".to_string() })],
        );
        disabled.enabled = false;

        h.workflows.insert(&matching).await.unwrap();
        h.workflows.insert(&other_trigger).await.unwrap();
        h.workflows.insert(&disabled).await.unwrap();

        let started = h
            .engine
            .trigger_workflows(
                TriggerType::NewCourseEnrollment,
                json!({"email": "s@x.com", "courseId": "c1"}),
            )
            .await;
        assert_eq!(started.len(), 1);

        let execution = wait_for_terminal(&h.executions, started[0]).await;
        assert_eq!(execution.workflow_id, matching.id);
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.subscriber_email.as_deref(), Some("s@x.com"));

        assert_eq!(h.subscribers.tags("s@x.com").await, vec!["enrolled"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_filters_select_workflows() {
        let h = harness();

        let filtered = Workflow::new(
            Uuid::new_v4(),
            "course c1 only",
            Trigger {
                trigger_type: TriggerType::NewCourseEnrollment,
                filters: vec![FilterRule {
                    field: "courseId".to_string(),
                    op: FilterOp::Equals,
                    value: Some("c1".to_string()),
                }],
            },
            vec![Step::new(0, StepAction::AddTag { tag: "c1-student".to_string() })],
        );
        h.workflows.insert(&filtered).await.unwrap();

        let missed = h
            .engine
            .trigger_workflows(
                TriggerType::NewCourseEnrollment,
                json!({"email": "s@x.com", "courseId": "c2"}),
            )
            .await;
        assert!(missed.is_empty());

        let started = h
            .engine
            .trigger_workflows(
                TriggerType::NewCourseEnrollment,
                json!({"email": "s@x.com", "courseId": "c1"}),
            )
            .await;
        assert_eq!(started.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrollment_drip_sequence_end_to_end() {
        let h = harness();

        let workflow = Workflow::new(
            Uuid::new_v4(),
            "enrollment drip",
            Trigger::on(TriggerType::NewCourseEnrollment),
            vec![
                Step::new(0, StepAction::AddTag { tag: "new-student".to_string() }),
                Step::new(
                    1,
                    StepAction::SendEmail {
                        subject: "Welcome aboard".to_string(),
                        body: "Your course starts now.".to_string(),
                        to: None,
                    },
                )
                .with_delay(1, DelayUnit::Days),
            ],
        );
        h.workflows.insert(&workflow).await.unwrap();

        let started = h
            .engine
            .trigger_workflows(
                TriggerType::NewCourseEnrollment,
                json!({"email": "s@x.com", "courseId": "c1"}),
            )
            .await;
        assert_eq!(started.len(), 1);

        let execution = wait_for_terminal(&h.executions, started[0]).await;
        assert_eq!(execution.status, ExecutionStatus::Completed);

        let logs = h.executions.list_step_logs(started[0]).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.status == StepLogStatus::Completed));

        let sent = h.email.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "s@x.com");
        assert_eq!(sent[0].subject, "Welcome aboard");

        let stored = h.workflows.get(workflow.id).await.unwrap().unwrap();
        assert_eq!(stored.total_runs, 1);
        assert_eq!(stored.successful_runs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_email_fails_the_execution() {
        let h = harness();

        let workflow = Workflow::new(
            Uuid::new_v4(),
            "needs email",
            Trigger::on(TriggerType::LeadCaptured),
            vec![
                Step::new(0, StepAction::AddTag { tag: "lead".to_string() }),
                Step::new(1, StepAction::AddTag { tag: "unreached".to_string() }),
            ],
        );
        h.workflows.insert(&workflow).await.unwrap();

        // Payload with no email: tag actions cannot resolve a subscriber
        let started = h
            .engine
            .trigger_workflows(TriggerType::LeadCaptured, json!({"source": "landing-page"}))
            .await;
        assert_eq!(started.len(), 1);

        let execution = wait_for_terminal(&h.executions, started[0]).await;
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error.as_deref().unwrap().contains("email"));

        let logs = h.executions.list_step_logs(started[0]).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepLogStatus::Failed);

        let stored = h.workflows.get(workflow.id).await.unwrap().unwrap();
        assert_eq!(stored.total_runs, 1);
        assert_eq!(stored.successful_runs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_triggers_count_independently() {
        let h = harness();

        let workflow = Workflow::new(
            Uuid::new_v4(),
            "counter",
            Trigger::on(TriggerType::FormSubmitted),
            vec![Step::new(0, StepAction::AddTag { tag: "submitted".to_string() })],
        );
        h.workflows.insert(&workflow).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..5 {
            let started = h
                .engine
                .trigger_workflows(
                    TriggerType::FormSubmitted,
                    json!({"email": format!("s{i}@x.com")}),
                )
                .await;
            ids.extend(started);
        }
        assert_eq!(ids.len(), 5);

        for id in ids {
            let execution = wait_for_terminal(&h.executions, id).await;
            assert_eq!(execution.status, ExecutionStatus::Completed);
        }

        let stored = h.workflows.get(workflow.id).await.unwrap().unwrap();
        assert_eq!(stored.total_runs, 5);
        assert_eq!(stored.successful_runs, 5);
    }
}
