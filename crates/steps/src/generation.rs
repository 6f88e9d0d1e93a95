//! The generation step handler.
//!
//! Picks the provider client the step selects, resolves the system prompt
//! from the step's purpose, formats the user prompt, and — on success —
//! appends exactly one usage record for the tokens and cost the provider
//! reports.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::action::{GenerationConfig, GenerationPurpose, StepAction, StepKind};
use crate::error::{ProviderError, StepError};
use crate::provider::{GenerationRequest, ProviderMap};
use crate::traits::{StepContext, StepHandler};
use crate::usage::{UsagePolicy, UsageRecorder};

/// Action tag written to every usage record this handler produces.
pub const USAGE_ACTION: &str = "generation";

pub struct GenerationHandler {
    providers: ProviderMap,
    recorder: Arc<dyn UsageRecorder>,
    policy: UsagePolicy,
}

impl GenerationHandler {
    pub fn new(providers: ProviderMap, recorder: Arc<dyn UsageRecorder>, policy: UsagePolicy) -> Self {
        Self {
            providers,
            recorder,
            policy,
        }
    }

    fn system_prompt(purpose: GenerationPurpose) -> &'static str {
        match purpose {
            GenerationPurpose::Code => {
                "You are an expert software developer. Generate clean, efficient, \
                 and well-documented code based on the user requirements."
            }
            GenerationPurpose::Documentation => {
                "You are a technical writer. Create comprehensive, clear documentation \
                 that helps developers understand and use the code."
            }
            GenerationPurpose::Test => {
                "You are a testing expert. Generate thorough unit tests that cover \
                 edge cases and follow best practices."
            }
            GenerationPurpose::Review => {
                "You are a senior code reviewer. Provide constructive feedback on code \
                 quality, security, performance, and best practices."
            }
        }
    }

    /// Append the optional language and the serialized context accumulator
    /// to the step's prompt.
    fn format_prompt(config: &GenerationConfig, ctx: &StepContext) -> String {
        let mut prompt = config.prompt.clone();

        if let Some(language) = &config.language {
            prompt.push_str("\n\nLanguage: ");
            prompt.push_str(language);
        }

        if !ctx.vars.is_empty() {
            prompt.push_str("\n\nContext: ");
            prompt.push_str(&ctx.vars.to_value().to_string());
        }

        prompt
    }
}

#[async_trait]
impl StepHandler for GenerationHandler {
    async fn process(&self, action: &StepAction, ctx: &StepContext) -> Result<Value, StepError> {
        let config = match action {
            StepAction::Generation(config) => config,
            other => return Err(StepError::kind_mismatch(StepKind::Generation, other.kind())),
        };

        let provider = self.providers.get(&config.provider).ok_or_else(|| {
            ProviderError::new(
                config.provider.to_string(),
                "no client configured for this provider",
            )
        })?;

        let request = GenerationRequest {
            prompt: Self::format_prompt(config, ctx),
            purpose: config.purpose,
            system_prompt: Self::system_prompt(config.purpose).to_owned(),
            max_tokens: config.max_tokens,
        };

        let response = provider.generate(&request).await?;

        let recorded = self
            .recorder
            .record(
                ctx.user_id,
                USAGE_ACTION,
                i64::from(response.tokens_used),
                response.cost,
            )
            .await;

        if let Err(err) = recorded {
            match self.policy {
                UsagePolicy::Required => return Err(StepError::Usage(err.to_string())),
                UsagePolicy::BestEffort => {
                    warn!(
                        execution_id = %ctx.execution_id,
                        "usage record dropped: {err}"
                    );
                }
            }
        }

        Ok(json!({
            "content": response.content,
            "tokens_used": response.tokens_used,
            "cost": response.cost,
            "model": response.model,
        }))
    }
}
