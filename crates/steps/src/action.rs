//! Typed step configuration.
//!
//! A step's wire shape is `{"type": "...", "config": {...}}`; the type tag
//! selects the variant at parse time, so each handler receives a payload it
//! can trust instead of poking at untyped JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

// ---------------------------------------------------------------------------
// StepKind
// ---------------------------------------------------------------------------

/// The fixed set of step capabilities the registry dispatches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Generation,
    ExternalAction,
    FileOperation,
    Webhook,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generation => write!(f, "generation"),
            Self::ExternalAction => write!(f, "external_action"),
            Self::FileOperation => write!(f, "file_operation"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

// ---------------------------------------------------------------------------
// StepAction
// ---------------------------------------------------------------------------

/// A step's type tag plus its strongly-typed configuration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum StepAction {
    Generation(GenerationConfig),
    ExternalAction(ExternalActionConfig),
    FileOperation(FileOperationConfig),
    Webhook(WebhookConfig),
}

impl StepAction {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Generation(_) => StepKind::Generation,
            Self::ExternalAction(_) => StepKind::ExternalAction,
            Self::FileOperation(_) => StepKind::FileOperation,
            Self::Webhook(_) => StepKind::Webhook,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-kind configuration payloads
// ---------------------------------------------------------------------------

/// What a generation step is for; selects the system prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPurpose {
    #[default]
    Code,
    Documentation,
    Test,
    Review,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// User-facing prompt; may contain `{{key}}` placeholders.
    pub prompt: String,
    #[serde(default)]
    pub purpose: GenerationPurpose,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalActionConfig {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// The file-system verbs a file-operation step can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Create,
    Read,
    Update,
    Delete,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Read => write!(f, "read"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOperationConfig {
    pub operation: FileOperation,
    pub path: String,
    /// Required for `create` and `update`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// HTTP method; defaults to POST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_parses_from_tagged_wire_shape() {
        let action: StepAction = serde_json::from_value(json!({
            "type": "generation",
            "config": { "prompt": "Say hi", "purpose": "documentation" }
        }))
        .unwrap();

        assert_eq!(action.kind(), StepKind::Generation);
        match action {
            StepAction::Generation(cfg) => {
                assert_eq!(cfg.prompt, "Say hi");
                assert_eq!(cfg.purpose, GenerationPurpose::Documentation);
                assert_eq!(cfg.provider, ProviderKind::OpenAi);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_tag_is_rejected_at_parse_time() {
        let result: Result<StepAction, _> = serde_json::from_value(json!({
            "type": "teleport",
            "config": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn webhook_config_defaults_are_optional() {
        let action: StepAction = serde_json::from_value(json!({
            "type": "webhook",
            "config": { "url": "https://example.com/hook" }
        }))
        .unwrap();

        match action {
            StepAction::Webhook(cfg) => {
                assert!(cfg.method.is_none());
                assert!(cfg.headers.is_none());
                assert!(cfg.body.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
