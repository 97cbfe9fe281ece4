//! Trigger matching.
//!
//! Decides which workflows a business event starts. A workflow matches
//! when it is enabled, Active, subscribed to the event's trigger type and
//! all of its filter rules are satisfied by the payload.

use crate::model::{TriggerType, Workflow, WorkflowStatus};

/// Whether the workflow should run for this event.
pub fn workflow_matches(
    workflow: &Workflow,
    trigger_type: TriggerType,
    payload: &serde_json::Value,
) -> bool {
    if !workflow.enabled || workflow.status != WorkflowStatus::Active {
        return false;
    }
    if workflow.trigger.trigger_type != trigger_type {
        return false;
    }
    workflow.trigger.filters_match(payload)
}
