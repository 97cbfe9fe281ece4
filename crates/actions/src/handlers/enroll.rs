//! ENROLL_IN_COURSE handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::action::StepAction;
use crate::collaborators::EnrollmentStore;
use crate::context::StepContext;
use crate::error::ActionError;
use crate::registry::ActionHandler;

use super::require_email;

/// Idempotently enrolls the subscriber in a course.
///
/// The upsert is keyed by (course_id, email): a record is created when
/// absent and left untouched when present.
pub struct EnrollInCourseHandler {
    enrollments: Arc<dyn EnrollmentStore>,
}

impl EnrollInCourseHandler {
    /// Create a new handler bound to an enrollment store.
    pub fn new(enrollments: Arc<dyn EnrollmentStore>) -> Self {
        Self { enrollments }
    }
}

#[async_trait]
impl ActionHandler for EnrollInCourseHandler {
    fn name(&self) -> &'static str {
        "ENROLL_IN_COURSE"
    }

    async fn execute(
        &self,
        action: &StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        let StepAction::EnrollInCourse { course_id } = action else {
            return Err(ActionError::UnknownAction(action.kind().to_string()));
        };
        action.validate()?;
        let email = require_email(ctx)?;
        let name = ctx.get_str("name");

        let created = self
            .enrollments
            .upsert_enrollment(course_id, email, name)
            .await?;

        tracing::info!(
            course_id = %course_id,
            email = %email,
            created = %created,
            "Enrollment upserted"
        );

        Ok(json!({
            "enrolled_course_id": course_id,
            "enrollment_created": created,
        }))
    }
}
