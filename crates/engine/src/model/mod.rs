//! Domain model: workflows, triggers, steps, executions and step logs.

pub mod execution;
pub mod status;
pub mod workflow;

pub use execution::{Execution, StepLog};
pub use status::{ExecutionStatus, StepLogStatus, WorkflowStatus};
pub use workflow::{DelayUnit, FilterOp, FilterRule, Step, StepDelay, Trigger, TriggerType, Workflow};
