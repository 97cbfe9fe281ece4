//! Dripline Workflow Engine
//!
//! Event-triggered marketing automation: workflows subscribe to business
//! events (enrollments, purchases, captured leads), and each matching
//! event starts an asynchronous execution that runs the workflow's steps
//! in order with per-step delays, retries and an audit trail.
//!
//! This crate provides:
//! - The workflow model (triggers, filters, steps, delays)
//! - Execution and step-log records with full lifecycle tracking
//! - Pluggable persistence (in-memory and Postgres)
//! - The engine core: trigger matching, execution coordination, step
//!   running and startup recovery

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;

pub use config::EngineConfig;
pub use engine::{AutomationEngine, ExecutionCoordinator, StepRunner};
pub use error::{EngineError, EngineResult};
