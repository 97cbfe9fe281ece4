//! Built-in action handlers, one per step kind.

mod condition;
mod enroll;
mod send_email;
mod tags;
mod wait;

pub use condition::ConditionHandler;
pub use enroll::EnrollInCourseHandler;
pub use send_email::SendEmailHandler;
pub use tags::{AddTagHandler, RemoveTagHandler};
pub use wait::WaitHandler;

use crate::context::StepContext;
use crate::error::ActionError;

/// Resolve the subscriber email from the context.
pub(crate) fn require_email(ctx: &StepContext) -> Result<&str, ActionError> {
    ctx.email()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ActionError::MissingContext("email".to_string()))
}
