//! Step-level error types.

use thiserror::Error;

use crate::action::StepKind;

/// Failure reported by a content-generation provider (transport, quota,
/// or a missing client for the selected provider).
#[derive(Debug, Clone, Error)]
#[error("{provider} provider error: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by a handler's `process` method.  Any of these fails the
/// step, which aborts the remaining steps of the run.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("usage recording failed: {0}")]
    Usage(String),

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("file operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid step configuration: {0}")]
    Config(String),

    #[error("handler for '{expected}' received a '{got}' step")]
    KindMismatch { expected: StepKind, got: StepKind },
}

impl StepError {
    pub(crate) fn kind_mismatch(expected: StepKind, got: StepKind) -> Self {
        Self::KindMismatch { expected, got }
    }
}
