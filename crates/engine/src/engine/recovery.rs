//! Startup recovery.
//!
//! An engine process that dies mid-execution leaves RUNNING records behind
//! with no task driving them. On the next startup these are reconciled:
//! every RUNNING execution whose heartbeat is older than the staleness
//! threshold is marked FAILED so operators and workflow owners can see it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{EngineError, EngineResult};
use crate::model::ExecutionStatus;
use crate::store::ExecutionStore;

/// Mark abandoned RUNNING executions as FAILED.
///
/// Returns the number of executions reconciled.
pub async fn reconcile_abandoned(
    executions: &Arc<dyn ExecutionStore>,
    stale_after: Duration,
) -> EngineResult<usize> {
    let stale_after = chrono::Duration::from_std(stale_after)
        .map_err(|e| EngineError::Internal(format!("invalid staleness threshold: {e}")))?;
    let cutoff = Utc::now() - stale_after;

    let stale = executions.list_stale_running(cutoff).await?;
    for execution in &stale {
        executions
            .finish_execution(
                execution.id,
                ExecutionStatus::Failed,
                Some("abandoned: no heartbeat from a previous engine process".to_string()),
                Utc::now(),
            )
            .await?;
        tracing::warn!(
            execution_id = %execution.id,
            workflow_id = %execution.workflow_id,
            heartbeat_at = %execution.heartbeat_at,
            "Reconciled abandoned execution as failed"
        );
    }

    if !stale.is_empty() {
        tracing::info!(count = stale.len(), "Abandoned execution reconciliation done");
    }
    Ok(stale.len())
}
