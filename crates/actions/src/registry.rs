//! Action handler registry and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::StepAction;
use crate::collaborators::Collaborators;
use crate::context::StepContext;
use crate::error::ActionError;
use crate::handlers;

/// Handler trait implementing one step kind's side effect.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The action kind this handler serves (e.g. "SEND_EMAIL").
    fn name(&self) -> &'static str;

    /// Execute the action with the given configuration and context.
    ///
    /// Returns an output object the coordinator may merge into the context
    /// for later steps.
    async fn execute(
        &self,
        action: &StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError>;
}

/// Registry of action handlers keyed by kind.
pub struct ActionRegistry {
    handlers: HashMap<&'static str, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Build the standard registry with all built-in handlers.
    pub fn with_builtin_handlers(collaborators: Collaborators) -> Self {
        let mut registry = Self::new();
        registry.register(handlers::SendEmailHandler::new(collaborators.email.clone()));
        registry.register(handlers::AddTagHandler::new(
            collaborators.subscribers.clone(),
        ));
        registry.register(handlers::RemoveTagHandler::new(
            collaborators.subscribers.clone(),
        ));
        registry.register(handlers::EnrollInCourseHandler::new(
            collaborators.enrollments.clone(),
        ));
        registry.register(handlers::WaitHandler::new());
        registry.register(handlers::ConditionHandler::new());
        registry
    }

    /// Register a handler.
    pub fn register<H: ActionHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Arc::new(handler));
    }

    /// Get a handler by kind.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(kind).cloned()
    }

    /// Check if a handler is registered for a kind.
    pub fn has(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// List all registered kinds.
    pub fn list(&self) -> Vec<&str> {
        self.handlers.keys().copied().collect()
    }

    /// Dispatch an action to its matching handler.
    pub async fn execute(
        &self,
        action: &StepAction,
        ctx: &StepContext,
    ) -> Result<serde_json::Value, ActionError> {
        let handler = self
            .get(action.kind())
            .ok_or_else(|| ActionError::UnknownAction(action.kind().to_string()))?;
        handler.execute(action, ctx).await
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
