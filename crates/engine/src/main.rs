//! Dripline Engine binary.
//!
//! Runs the workflow engine with a Postgres store when DATABASE_URL is
//! set, otherwise with in-memory stores and a seeded demo workflow.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dripline_actions::{ActionRegistry, Collaborators, StepAction};
use dripline_engine::model::{DelayUnit, Step, Trigger, TriggerType, Workflow};
use dripline_engine::store::{
    postgres, InMemoryExecutionStore, InMemoryWorkflowStore, PgExecutionStore, PgWorkflowStore,
};
use dripline_engine::{AutomationEngine, EngineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dripline_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    tracing::info!("Starting Dripline Engine");

    // Load configuration
    let config = EngineConfig::from_env()?;
    tracing::info!(
        max_action_retries = config.max_action_retries,
        abandoned_after_secs = config.abandoned_after_secs,
        "Engine configuration loaded"
    );

    let (collaborators, email, _subscribers, _enrollments) = Collaborators::in_memory();
    let registry = Arc::new(ActionRegistry::with_builtin_handlers(collaborators));

    let engine = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = postgres::create_pool(&database_url, 5).await?;
            postgres::ensure_schema(&pool).await?;
            tracing::info!("Connected to Postgres");
            AutomationEngine::new(
                Arc::new(PgWorkflowStore::new(pool.clone())),
                Arc::new(PgExecutionStore::new(pool)),
                registry,
                config,
            )
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            let workflows = Arc::new(InMemoryWorkflowStore::new());
            seed_demo_workflow(&workflows).await?;
            AutomationEngine::new(
                workflows,
                Arc::new(InMemoryExecutionStore::new()),
                registry,
                config,
            )
        }
    };

    // Fail executions a previous process left behind
    let reconciled = engine.reconcile_abandoned().await?;
    if reconciled > 0 {
        tracing::info!(count = reconciled, "Reconciled abandoned executions");
    }

    // Demo event so the engine has something to do out of the box
    let started = engine
        .trigger_workflows(
            TriggerType::NewCourseEnrollment,
            serde_json::json!({
                "email": "student@example.com",
                "name": "Demo Student",
                "courseId": "course-101",
            }),
        )
        .await;
    tracing::info!(executions = started.len(), "Demo trigger fired");

    // Handle shutdown signals
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    for message in email.sent().await {
        tracing::info!(to = %message.to, subject = %message.subject, "Email was sent during this run");
    }

    tracing::info!("Engine stopped");
    Ok(())
}

/// Seed the in-memory store with a welcome drip workflow.
async fn seed_demo_workflow(workflows: &Arc<InMemoryWorkflowStore>) -> Result<()> {
    let workflow = Workflow::new(
        uuid::Uuid::new_v4(),
        "Course welcome drip",
        Trigger::on(TriggerType::NewCourseEnrollment),
        vec![
            Step::new(
                0,
                StepAction::AddTag {
                    tag: "new-student".to_string(),
                },
            ),
            Step::new(
                1,
                StepAction::SendEmail {
                    subject: "Welcome to the course".to_string(),
                    body: "Glad to have you on board!".to_string(),
                    to: None,
                },
            )
            .with_delay(1, DelayUnit::Minutes),
        ],
    );
    use dripline_engine::store::WorkflowStore;
    workflows.insert(&workflow).await?;
    tracing::info!(workflow_id = %workflow.id, "Seeded demo workflow");
    Ok(())
}
