//! Postgres store implementations.
//!
//! Workflow definitions keep their trigger and steps as JSONB; executions
//! and step logs are append-heavy row tables. Run counters are updated with
//! a single relative `UPDATE` so concurrent completions stay correct.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::model::{Execution, ExecutionStatus, StepLog, StepLogStatus, TriggerType, Workflow};
use crate::store::{ExecutionStore, WorkflowStore};

/// Type alias for the PostgreSQL connection pool.
pub type DbPool = PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Database connection pool created");
    Ok(pool)
}

/// Create the dripline schema and tables if they do not exist.
pub async fn ensure_schema(pool: &DbPool) -> EngineResult<()> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS dripline")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dripline.workflow (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            name TEXT NOT NULL,
            enabled BOOLEAN NOT NULL DEFAULT TRUE,
            status TEXT NOT NULL DEFAULT 'active',
            trigger JSONB NOT NULL,
            steps JSONB NOT NULL,
            total_runs BIGINT NOT NULL DEFAULT 0,
            successful_runs BIGINT NOT NULL DEFAULT 0,
            last_run_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dripline.execution (
            id UUID PRIMARY KEY,
            workflow_id UUID NOT NULL,
            status TEXT NOT NULL DEFAULT 'running',
            payload JSONB NOT NULL,
            subscriber_email TEXT,
            started_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            heartbeat_at TIMESTAMPTZ NOT NULL,
            error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dripline.step_log (
            id UUID PRIMARY KEY,
            execution_id UUID NOT NULL,
            step_id UUID NOT NULL,
            step_order INT NOT NULL,
            status TEXT NOT NULL DEFAULT 'running',
            input JSONB NOT NULL,
            output JSONB,
            error TEXT,
            started_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

type WorkflowRow = (
    Uuid,
    Uuid,
    String,
    bool,
    String,
    serde_json::Value,
    serde_json::Value,
    i64,
    i64,
    Option<DateTime<Utc>>,
);

fn workflow_from_row(row: WorkflowRow) -> EngineResult<Workflow> {
    let (id, owner_id, name, enabled, status, trigger, steps, total_runs, successful_runs, last_run_at) = row;
    Ok(Workflow {
        id,
        owner_id,
        name,
        enabled,
        status: status.as_str().into(),
        trigger: serde_json::from_value(trigger)?,
        steps: serde_json::from_value(steps)?,
        total_runs,
        successful_runs,
        last_run_at,
    })
}

type ExecutionRow = (
    Uuid,
    Uuid,
    String,
    serde_json::Value,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    Option<String>,
);

fn execution_from_row(row: ExecutionRow) -> Execution {
    let (id, workflow_id, status, payload, subscriber_email, started_at, completed_at, heartbeat_at, error) = row;
    Execution {
        id,
        workflow_id,
        status: status.as_str().into(),
        payload,
        subscriber_email,
        started_at,
        completed_at,
        heartbeat_at,
        error,
    }
}

type StepLogRow = (
    Uuid,
    Uuid,
    Uuid,
    i32,
    String,
    serde_json::Value,
    Option<serde_json::Value>,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn step_log_from_row(row: StepLogRow) -> StepLog {
    let (id, execution_id, step_id, step_order, status, input, output, error, started_at, completed_at) = row;
    StepLog {
        id,
        execution_id,
        step_id,
        step_order,
        status: status.as_str().into(),
        input,
        output,
        error,
        started_at,
        completed_at,
    }
}

/// Postgres-backed workflow store.
#[derive(Clone)]
pub struct PgWorkflowStore {
    pool: DbPool,
}

impl PgWorkflowStore {
    /// Create a store over an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn insert(&self, workflow: &Workflow) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dripline.workflow (
                id, owner_id, name, enabled, status, trigger, steps,
                total_runs, successful_runs, last_run_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(workflow.id)
        .bind(workflow.owner_id)
        .bind(&workflow.name)
        .bind(workflow.enabled)
        .bind(workflow.status.to_string())
        .bind(serde_json::to_value(&workflow.trigger)?)
        .bind(serde_json::to_value(&workflow.steps)?)
        .bind(workflow.total_runs)
        .bind(workflow.successful_runs)
        .bind(workflow.last_run_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<Workflow>> {
        let row: Option<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, name, enabled, status, trigger, steps,
                   total_runs, successful_runs, last_run_at
            FROM dripline.workflow
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(workflow_from_row).transpose()
    }

    async fn list_by_trigger(&self, trigger_type: TriggerType) -> EngineResult<Vec<Workflow>> {
        let rows: Vec<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, name, enabled, status, trigger, steps,
                   total_runs, successful_runs, last_run_at
            FROM dripline.workflow
            WHERE trigger->>'trigger_type' = $1
            "#,
        )
        .bind(trigger_type.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(workflow_from_row).collect()
    }

    async fn record_run(&self, id: Uuid, success: bool, at: DateTime<Utc>) -> EngineResult<()> {
        // Single relative update keeps concurrent completions correct.
        sqlx::query(
            r#"
            UPDATE dripline.workflow
            SET total_runs = total_runs + 1,
                successful_runs = successful_runs + $2,
                last_run_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(if success { 1i64 } else { 0i64 })
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Postgres-backed execution store.
#[derive(Clone)]
pub struct PgExecutionStore {
    pool: DbPool,
}

impl PgExecutionStore {
    /// Create a store over an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn insert_execution(&self, execution: &Execution) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dripline.execution (
                id, workflow_id, status, payload, subscriber_email,
                started_at, completed_at, heartbeat_at, error
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(execution.id)
        .bind(execution.workflow_id)
        .bind(execution.status.to_string())
        .bind(&execution.payload)
        .bind(&execution.subscriber_email)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .bind(execution.heartbeat_at)
        .bind(&execution.error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> EngineResult<Option<Execution>> {
        let row: Option<ExecutionRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, status, payload, subscriber_email,
                   started_at, completed_at, heartbeat_at, error
            FROM dripline.execution
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(execution_from_row))
    }

    async fn finish_execution(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        // The status guard makes terminal states sticky.
        sqlx::query(
            r#"
            UPDATE dripline.execution
            SET status = $2, error = $3, completed_at = $4, heartbeat_at = $4
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(error)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch_heartbeat(&self, id: Uuid, at: DateTime<Utc>) -> EngineResult<()> {
        sqlx::query("UPDATE dripline.execution SET heartbeat_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_step_log(&self, log: &StepLog) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dripline.step_log (
                id, execution_id, step_id, step_order, status,
                input, output, error, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(log.id)
        .bind(log.execution_id)
        .bind(log.step_id)
        .bind(log.step_order)
        .bind(log.status.to_string())
        .bind(&log.input)
        .bind(&log.output)
        .bind(&log.error)
        .bind(log.started_at)
        .bind(log.completed_at)
        .execute(&self.pool)
        .await?;

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
        sqlx::query(
            r#"
            UPDATE dripline.step_log
            SET status = $2, output = $3, error = $4, completed_at = $5
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(output)
        .bind(error)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_step_logs(&self, execution_id: Uuid) -> EngineResult<Vec<StepLog>> {
        let rows: Vec<StepLogRow> = sqlx::query_as(
            r#"
            SELECT id, execution_id, step_id, step_order, status,
                   input, output, error, started_at, completed_at
            FROM dripline.step_log
            WHERE execution_id = $1
            ORDER BY step_order ASC
            "#,
        )
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(step_log_from_row).collect())
    }

    async fn list_stale_running(&self, cutoff: DateTime<Utc>) -> EngineResult<Vec<Execution>> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, status, payload, subscriber_email,
                   started_at, completed_at, heartbeat_at, error
            FROM dripline.execution
            WHERE status = 'running' AND heartbeat_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(execution_from_row).collect())
    }
}
