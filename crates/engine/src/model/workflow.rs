//! Workflow, trigger and step definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dripline_actions::StepAction;

use crate::error::{EngineError, EngineResult};
use crate::model::status::WorkflowStatus;

/// Business event types that can trigger a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    /// A student enrolled in a course.
    NewCourseEnrollment,
    /// A booking was created.
    NewBooking,
    /// A product was purchased.
    ProductPurchased,
    /// A lead magnet captured a lead.
    LeadCaptured,
    /// A form was submitted.
    FormSubmitted,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NewCourseEnrollment => "NEW_COURSE_ENROLLMENT",
            Self::NewBooking => "NEW_BOOKING",
            Self::ProductPurchased => "PRODUCT_PURCHASED",
            Self::LeadCaptured => "LEAD_CAPTURED",
            Self::FormSubmitted => "FORM_SUBMITTED",
        };
        write!(f, "{}", s)
    }
}

/// Operator in a trigger filter rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact string match.
    Equals,
    /// Substring match.
    Contains,
    /// Field is present and non-null.
    Exists,
}

/// One structured criterion evaluated against the event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Payload field name.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparison value; ignored for `exists`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FilterRule {
    /// Whether the rule matches the payload.
    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        let field_value = payload.get(&self.field);
        match self.op {
            FilterOp::Exists => matches!(field_value, Some(v) if !v.is_null()),
            FilterOp::Equals => match (coerce(field_value), &self.value) {
                (Some(actual), Some(expected)) => actual == *expected,
                _ => false,
            },
            FilterOp::Contains => match (coerce(field_value), &self.value) {
                (Some(actual), Some(expected)) => actual.contains(expected.as_str()),
                _ => false,
            },
        }
    }
}

fn coerce(value: Option<&serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

/// Trigger definition attached 1:1 to a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// The business event type this workflow subscribes to.
    pub trigger_type: TriggerType,
    /// Structured filter criteria; all rules must match. Empty = match all.
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl Trigger {
    /// Trigger with no filter criteria.
    pub fn on(trigger_type: TriggerType) -> Self {
        Self {
            trigger_type,
            filters: Vec::new(),
        }
    }

    /// Whether the filter criteria are satisfied by the payload.
    pub fn filters_match(&self, payload: &serde_json::Value) -> bool {
        self.filters.iter().all(|rule| rule.matches(payload))
    }
}

/// Delay unit for a step's wait-before-dispatch.
///
/// Unknown units deserialize to `Unknown` and compute to a zero delay
/// (fail open), matching the engine's observed behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    #[serde(other)]
    Unknown,
}

impl From<&str> for DelayUnit {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MINUTES" => Self::Minutes,
            "HOURS" => Self::Hours,
            "DAYS" => Self::Days,
            "WEEKS" => Self::Weeks,
            _ => Self::Unknown,
        }
    }
}

/// Optional wait applied before a step is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDelay {
    pub amount: u64,
    pub unit: DelayUnit,
}

/// One step definition within a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier.
    pub id: Uuid,
    /// Position in the execution sequence; unique and contiguous from 0.
    pub order: i32,
    /// The action this step performs.
    pub action: StepAction,
    /// Optional delay applied before dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<StepDelay>,
}

impl Step {
    /// Create a step with a fresh id and no delay.
    pub fn new(order: i32, action: StepAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            order,
            action,
            delay: None,
        }
    }

    /// Attach a delay to the step.
    pub fn with_delay(mut self, amount: u64, unit: DelayUnit) -> Self {
        self.delay = Some(StepDelay { amount, unit });
        self
    }
}

/// A user-owned automation definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow identifier.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether the workflow is enabled for trigger matching.
    pub enabled: bool,
    /// Lifecycle status; only Active workflows are matched.
    pub status: WorkflowStatus,
    /// The trigger this workflow subscribes to.
    pub trigger: Trigger,
    /// Ordered step definitions.
    pub steps: Vec<Step>,
    /// Total executions started.
    pub total_runs: i64,
    /// Executions that completed without failure.
    pub successful_runs: i64,
    /// Timestamp of the most recent run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// Create an enabled, active workflow.
    pub fn new(owner_id: Uuid, name: &str, trigger: Trigger, steps: Vec<Step>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            enabled: true,
            status: WorkflowStatus::Active,
            trigger,
            steps,
            total_runs: 0,
            successful_runs: 0,
            last_run_at: None,
        }
    }

    /// Steps sorted by ascending order.
    pub fn steps_in_order(&self) -> Vec<&Step> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// Validate the workflow definition.
    ///
    /// Checks that step orders are unique and contiguous from 0 and that
    /// each step's configuration is valid for its action kind. Run at
    /// authoring time; handlers re-check config defensively at run time.
    pub fn validate(&self) -> EngineResult<()> {
        let mut orders: Vec<i32> = self.steps.iter().map(|s| s.order).collect();
        orders.sort_unstable();
        for (expected, order) in orders.iter().enumerate() {
            if *order != expected as i32 {
                return Err(EngineError::Validation(format!(
                    "step orders must be unique and contiguous from 0, got {:?}",
                    orders
                )));
            }
        }
        for step in &self.steps {
            step.action.validate().map_err(|e| {
                EngineError::Validation(format!("step {} ({}): {}", step.order, step.action.kind(), e))
            })?;
        }
        Ok(())
    }
}
