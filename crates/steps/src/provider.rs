//! The content-generation capability interface.
//!
//! Concrete API clients live outside this repository; everything here is
//! the seam they plug into, plus [`StaticProvider`], a deterministic
//! offline implementation used by tests and `serve` runs without
//! credentials.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::GenerationPurpose;
use crate::error::ProviderError;

// ---------------------------------------------------------------------------
// ProviderKind
// ---------------------------------------------------------------------------

/// The enumerated set of generation backends a step may select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully formatted user prompt (system prompt is the provider's concern).
    pub prompt: String,
    pub purpose: GenerationPurpose,
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub content: String,
    pub tokens_used: u32,
    pub cost: f64,
    pub model: String,
}

/// Pluggable generation client.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, ProviderError>;
}

/// Provider clients keyed by the kind a step selects.
pub type ProviderMap = HashMap<ProviderKind, Arc<dyn GenerationProvider>>;

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Cost in cents per 1K tokens for the models the static provider emulates.
/// Unknown models fall back to the most expensive known rate.
pub fn rate_per_thousand_tokens(model: &str) -> f64 {
    match model {
        "gpt-4-turbo-preview" => 3.0,
        "gpt-3.5-turbo" => 0.2,
        "claude-3-sonnet" => 0.9,
        _ => 3.0,
    }
}

// ---------------------------------------------------------------------------
// StaticProvider
// ---------------------------------------------------------------------------

/// Offline provider: echoes a canned completion derived from the request.
///
/// Token usage is a deterministic estimate (one token per four prompt
/// characters, plus a flat completion allowance), so tests can predict the
/// usage rows it produces.
pub struct StaticProvider {
    model: String,
}

impl StaticProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }

    fn estimate_tokens(prompt: &str) -> u32 {
        (prompt.len() as u32 / 4) + 64
    }
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new("gpt-4-turbo-preview")
    }
}

#[async_trait]
impl GenerationProvider for StaticProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let tokens_used = Self::estimate_tokens(&request.prompt);
        let cost = f64::from(tokens_used) / 1000.0 * rate_per_thousand_tokens(&self.model);

        Ok(GenerationResponse {
            content: format!("[{}] {}", self.model, request.prompt),
            tokens_used,
            cost,
            model: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_is_deterministic() {
        let provider = StaticProvider::default();
        let request = GenerationRequest {
            prompt: "Say hi".into(),
            purpose: GenerationPurpose::Code,
            system_prompt: String::new(),
            max_tokens: None,
        };

        let first = provider.generate(&request).await.unwrap();
        let second = provider.generate(&request).await.unwrap();

        assert_eq!(first.tokens_used, second.tokens_used);
        assert_eq!(first.cost, second.cost);
        assert!(first.content.contains("Say hi"));
    }

    #[test]
    fn unknown_models_price_at_the_top_rate() {
        assert_eq!(rate_per_thousand_tokens("mystery-model"), 3.0);
    }
}
