//! The usage-accounting capability.
//!
//! One record per billable step execution, appended through whatever sink
//! the deployment injects (the engine crate provides a store-backed
//! adapter).  There is no read path here.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// The sink rejected or failed to persist the record.
#[derive(Debug, Error)]
#[error("usage sink rejected the record: {0}")]
pub struct UsageError(pub String);

/// Whether a failed append fails the step that produced the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsagePolicy {
    /// Accounting is load-bearing: a failed append fails the step.
    #[default]
    Required,
    /// Accounting is advisory: a failed append is logged and the step
    /// completes anyway.
    BestEffort,
}

#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record(
        &self,
        user_id: Uuid,
        action: &str,
        tokens: i64,
        cost: f64,
    ) -> Result<(), UsageError>;
}
