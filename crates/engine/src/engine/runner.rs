//! Step execution.
//!
//! Runs a single step: records a RUNNING step log with the context
//! snapshot, applies the step's delay, dispatches to the matching action
//! handler (with bounded retries for transient failures), then moves the
//! log to COMPLETED or FAILED. A failed step propagates to the coordinator,
//! which halts the execution.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use dripline_actions::{ActionError, ActionRegistry, StepContext};

use crate::config::EngineConfig;
use crate::engine::delay::delay_duration;
use crate::error::{EngineError, EngineResult};
use crate::model::{Step, StepLog, StepLogStatus};
use crate::store::ExecutionStore;

/// Executes individual steps against the action registry.
#[derive(Clone)]
pub struct StepRunner {
    executions: Arc<dyn ExecutionStore>,
    registry: Arc<ActionRegistry>,
    config: EngineConfig,
}

impl StepRunner {
    /// Create a new step runner.
    pub fn new(
        executions: Arc<dyn ExecutionStore>,
        registry: Arc<ActionRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            executions,
            registry,
            config,
        }
    }

    /// Run one step and return its output.
    pub async fn run_step(
        &self,
        execution_id: Uuid,
        step: &Step,
        ctx: &StepContext,
    ) -> EngineResult<serde_json::Value> {
        let log = StepLog::start(execution_id, step.id, step.order, ctx.to_value());
        let log_id = log.id;
        self.executions.insert_step_log(&log).await?;

        tracing::debug!(
            execution_id = %execution_id,
            step_order = step.order,
            kind = %step.action.kind(),
            "Step started"
        );

        if let Some(delay) = &step.delay {
            let duration = delay_duration(delay);
            if !duration.is_zero() {
                tracing::debug!(
                    execution_id = %execution_id,
                    step_order = step.order,
                    delay_secs = duration.as_secs(),
                    "Suspending before dispatch"
                );
                tokio::time::sleep(duration).await;
            }
        }

        match self.dispatch_with_retry(&step.action, ctx).await {
            Ok(output) => {
                self.executions
                    .finish_step_log(
                        log_id,
                        StepLogStatus::Completed,
                        Some(output.clone()),
                        None,
                        Utc::now(),
                    )
                    .await?;

                tracing::info!(
                    execution_id = %execution_id,
                    step_order = step.order,
                    kind = %step.action.kind(),
                    "Step completed"
                );
                Ok(output)
            }
            Err(e) => {
                self.executions
                    .finish_step_log(
                        log_id,
                        StepLogStatus::Failed,
                        None,
                        Some(e.to_string()),
                        Utc::now(),
                    )
                    .await?;

                tracing::error!(
                    execution_id = %execution_id,
                    step_order = step.order,
                    kind = %step.action.kind(),
                    error = %e,
                    "Step failed"
                );
                Err(EngineError::Action(e))
            }
        }
    }

    /// Dispatch to the action registry, retrying transient failures.
    ///
    /// Configuration errors fail immediately; collaborator errors are
    /// retried with exponential backoff up to `max_action_retries`.
    async fn dispatch_with_retry(
        &self,
        action: &dripline_actions::StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        let mut attempt: u32 = 0;
        loop {
            match self.registry.execute(action, ctx).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_transient() && attempt < self.config.max_action_retries => {
                    let backoff = self.config.retry_delay(attempt);
                    tracing::warn!(
                        kind = %action.kind(),
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient action failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DelayUnit;
    use crate::store::InMemoryExecutionStore;
    use async_trait::async_trait;
    use dripline_actions::{ActionHandler, StepAction};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyHandler {
        calls: Arc<AtomicU32>,
        fail_times: u32,
        transient: bool,
    }

    #[async_trait]
    impl ActionHandler for FlakyHandler {
        fn name(&self) -> &'static str {
            "WAIT"
        }

        async fn execute(
            &self,
            _action: &StepAction,
            _ctx: &StepContext,
        ) -> Result<serde_json::Value, ActionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_times {
                if self.transient {
                    Err(ActionError::Collaborator("flaky".to_string()))
                } else {
                    Err(ActionError::MissingConfig("tag".to_string()))
                }
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    fn runner_with(handler: FlakyHandler) -> (StepRunner, Arc<InMemoryExecutionStore>) {
        let store = Arc::new(InMemoryExecutionStore::new());
        let mut registry = ActionRegistry::new();
        registry.register(handler);
        let runner = StepRunner::new(store.clone(), Arc::new(registry), EngineConfig::default());
        (runner, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let (runner, store) = runner_with(FlakyHandler {
            calls: calls.clone(),
            fail_times: 2,
            transient: true,
        });

        let execution_id = Uuid::new_v4();
        let step = Step::new(0, StepAction::Wait);
        let ctx = StepContext::new();

        let output = runner.run_step(execution_id, &step, &ctx).await.unwrap();
        assert_eq!(output, json!({"ok": true}));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let logs = store.list_step_logs(execution_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepLogStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let (runner, store) = runner_with(FlakyHandler {
            calls: calls.clone(),
            fail_times: 1,
            transient: false,
        });

        let execution_id = Uuid::new_v4();
        let step = Step::new(0, StepAction::Wait);
        let ctx = StepContext::new();

        let result = runner.run_step(execution_id, &step, &ctx).await;
        assert!(matches!(result, Err(EngineError::Action(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let logs = store.list_step_logs(execution_id).await.unwrap();
        assert_eq!(logs[0].status, StepLogStatus::Failed);
        assert!(logs[0].error.as_deref().unwrap().contains("tag"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let (runner, _store) = runner_with(FlakyHandler {
            calls: calls.clone(),
            fail_times: u32::MAX,
            transient: true,
        });

        let execution_id = Uuid::new_v4();
        let step = Step::new(0, StepAction::Wait);
        let ctx = StepContext::new();

        let result = runner.run_step(execution_id, &step, &ctx).await;
        assert!(result.is_err());
        // Initial attempt + max_action_retries (default 2)
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_applied_before_dispatch() {
        let calls = Arc::new(AtomicU32::new(0));
        let (runner, store) = runner_with(FlakyHandler {
            calls: calls.clone(),
            fail_times: 0,
            transient: true,
        });

        let execution_id = Uuid::new_v4();
        let step = Step::new(0, StepAction::Wait).with_delay(2, DelayUnit::Hours);
        let ctx = StepContext::new();

        let started = tokio::time::Instant::now();
        runner.run_step(execution_id, &step, &ctx).await.unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_secs(7_200));

        let logs = store.list_step_logs(execution_id).await.unwrap();
        assert_eq!(logs[0].status, StepLogStatus::Completed);
    }
}
