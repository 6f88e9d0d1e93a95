//! Engine-level error types.

use thiserror::Error;

use steps::StepKind;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more steps share the same ID.
    #[error("duplicate step ID: '{0}'")]
    DuplicateStepId(String),

    /// A step declares a dependency on an ID that doesn't exist in the
    /// workflow.
    #[error("step '{step_id}' depends on unknown step '{dependency}'")]
    UnknownDependency { step_id: String, dependency: String },

    /// The declared dependency graph contains a cycle.
    #[error("step dependencies contain a cycle")]
    DependencyCycle,

    // ------ Execution errors ------

    /// No handler is registered for a step's kind; fatal to the run.
    ///
    /// Handler-level failures (`steps::StepError`) are not wrapped here:
    /// the runner captures them into the execution row's logs and error
    /// fields, and callers observe them by polling, never as a returned
    /// error.
    #[error("unknown step type '{0}'")]
    UnknownStepType(StepKind),

    /// A stored definition or job payload is not valid for its type.
    #[error("invalid stored definition: {0}")]
    Definition(#[from] serde_json::Error),

    /// Persistence error from the store crate.
    #[error("storage error: {0}")]
    Store(#[from] store::StoreError),

    /// The job queue has shut down; the execution was not enqueued.
    #[error("job queue is closed")]
    QueueClosed,
}
