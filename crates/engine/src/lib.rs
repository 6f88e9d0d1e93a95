//! `engine` crate — domain models, validation, and the execution engine.
//!
//! The pieces, leaves first: the template interpolator, workflow
//! validation, the execution runner (one state machine per run), the
//! submission service that turns an API call into a queued job, and the
//! worker pool that drains the queue.

pub mod error;
pub mod models;
pub mod notify;
pub mod runner;
pub mod submit;
pub mod template;
pub mod usage;
pub mod validate;
pub mod worker;

pub use error::EngineError;
pub use models::{Job, Step, StepLog, StepLogStatus, Trigger, Workflow, WorkflowDefinition};
pub use notify::{ChannelNotifier, ExecutionEvent, NoopNotifier, Notifier};
pub use runner::ExecutionRunner;
pub use submit::Submitter;
pub use template::{interpolate, interpolate_value};
pub use usage::StoreUsageRecorder;
pub use validate::validate_steps;
pub use worker::spawn_workers;

#[cfg(test)]
mod runner_tests;
