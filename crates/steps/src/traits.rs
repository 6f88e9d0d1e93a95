//! The [`StepHandler`] trait — the contract every step processor fulfils.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::action::StepAction;
use crate::context::Context;
use crate::error::StepError;

/// Per-execution state passed to every handler.
///
/// Defined here (in the steps crate) so both the engine and individual
/// handler implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// ID of the current execution run.
    pub execution_id: Uuid,
    /// ID of the parent workflow.
    pub workflow_id: Uuid,
    /// User the run is billed to.
    pub user_id: Uuid,
    /// The context accumulator: input fields plus prior step results.
    pub vars: Context,
}

/// The core handler trait.
///
/// The engine resolves a step's kind against the registry and calls the
/// matching handler with the step's (already interpolated) action.  A
/// handler receives the whole tagged action and is expected to reject any
/// variant it does not own with [`StepError::KindMismatch`].
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn process(&self, action: &StepAction, ctx: &StepContext) -> Result<Value, StepError>;
}
