//! `steps` crate — the step-processor capability set.
//!
//! Defines the typed step configuration ([`StepAction`]), the
//! [`StepHandler`] trait the engine dispatches through, the per-execution
//! context accumulator, and the built-in handlers: generation,
//! external-action, file-operation, and webhook.  The generation handler
//! consumes two further capabilities defined here: [`GenerationProvider`]
//! (the pluggable content-generation client) and [`UsageRecorder`] (the
//! billable-work accounting sink).

pub mod action;
pub mod context;
pub mod error;
pub mod external_action;
pub mod file_op;
pub mod generation;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod traits;
pub mod usage;
pub mod webhook;

pub use action::{
    ExternalActionConfig, FileOperation, FileOperationConfig, GenerationConfig, GenerationPurpose,
    StepAction, StepKind, WebhookConfig,
};
pub use context::Context;
pub use error::{ProviderError, StepError};
pub use generation::GenerationHandler;
pub use provider::{
    GenerationProvider, GenerationRequest, GenerationResponse, ProviderKind, ProviderMap,
    StaticProvider,
};
pub use registry::{builtin_registry, HandlerRegistry};
pub use traits::{StepContext, StepHandler};
pub use usage::{UsageError, UsagePolicy, UsageRecorder};
