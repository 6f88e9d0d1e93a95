//! The external-action step handler.
//!
//! Acknowledgement-only integration point: the actual remote system
//! (repository host, ticket tracker, …) is driven by infrastructure outside
//! this repository, so the handler validates the configuration and reports
//! the action as dispatched.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::action::{StepAction, StepKind};
use crate::error::StepError;
use crate::traits::{StepContext, StepHandler};

#[derive(Default)]
pub struct ExternalActionHandler;

impl ExternalActionHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepHandler for ExternalActionHandler {
    async fn process(&self, action: &StepAction, _ctx: &StepContext) -> Result<Value, StepError> {
        let config = match action {
            StepAction::ExternalAction(config) => config,
            other => {
                return Err(StepError::kind_mismatch(StepKind::ExternalAction, other.kind()))
            }
        };

        if config.action.trim().is_empty() {
            return Err(StepError::Config("external action name is empty".into()));
        }

        Ok(json!({
            "action": config.action,
            "repository": config.repository,
            "branch": config.branch,
            "status": "completed",
        }))
    }
}
