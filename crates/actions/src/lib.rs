//! Dripline Action Library
//!
//! Step action handlers shared by the workflow engine.
//!
//! This crate provides:
//! - The `StepAction` model (one strongly-typed configuration per step kind)
//! - Collaborator interfaces (email sender, subscriber directory, enrollments)
//! - Action handlers with defensive config validation
//! - The condition expression evaluator
//! - An action registry for dispatch by step kind

pub mod action;
pub mod collaborators;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod handlers;
pub mod registry;

pub use action::StepAction;
pub use collaborators::{Collaborators, EmailSender, EnrollmentStore, SubscriberDirectory};
pub use context::StepContext;
pub use error::ActionError;
pub use evaluator::ConditionEvaluator;
pub use registry::{ActionHandler, ActionRegistry};
