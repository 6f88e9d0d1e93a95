//! The step-processor registry.
//!
//! Maps a [`StepKind`] to the handler that performs it.  The engine fails a
//! run with an unknown-step-type error when a kind has no registration, so
//! deployments can ship a partial capability set deliberately.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::action::StepKind;
use crate::external_action::ExternalActionHandler;
use crate::file_op::FileOperationHandler;
use crate::generation::GenerationHandler;
use crate::provider::ProviderMap;
use crate::traits::StepHandler;
use crate::usage::{UsagePolicy, UsageRecorder};
use crate::webhook::WebhookHandler;

/// Dispatch table from step kind to handler.
pub type HandlerRegistry = HashMap<StepKind, Arc<dyn StepHandler>>;

/// Wire the four built-in handlers.
///
/// `file_root` confines file-operation steps to a sandbox directory when
/// set; `None` leaves paths unrestricted (trusted deployments only).
pub fn builtin_registry(
    providers: ProviderMap,
    recorder: Arc<dyn UsageRecorder>,
    policy: UsagePolicy,
    http: reqwest::Client,
    file_root: Option<PathBuf>,
) -> HandlerRegistry {
    let file_handler = match file_root {
        Some(root) => FileOperationHandler::sandboxed(root),
        None => FileOperationHandler::new(),
    };

    let mut registry: HandlerRegistry = HashMap::new();
    registry.insert(
        StepKind::Generation,
        Arc::new(GenerationHandler::new(providers, recorder, policy)),
    );
    registry.insert(StepKind::ExternalAction, Arc::new(ExternalActionHandler::new()));
    registry.insert(StepKind::FileOperation, Arc::new(file_handler));
    registry.insert(StepKind::Webhook, Arc::new(WebhookHandler::new(http)));
    registry
}
