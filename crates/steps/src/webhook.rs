//! The webhook step handler.
//!
//! Sends one HTTP request per step through an injected `reqwest::Client`.
//! A transport failure fails the step; a response of any status completes
//! it, carrying the status code in the result so later steps (and the
//! execution record) can see what the remote said.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::action::{StepAction, StepKind, WebhookConfig};
use crate::error::StepError;
use crate::traits::{StepContext, StepHandler};

pub struct WebhookHandler {
    client: reqwest::Client,
}

impl WebhookHandler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn method(config: &WebhookConfig) -> Result<Method, StepError> {
        match &config.method {
            None => Ok(Method::POST),
            Some(raw) => Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
                .map_err(|_| StepError::Config(format!("invalid HTTP method '{raw}'"))),
        }
    }
}

impl Default for WebhookHandler {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl StepHandler for WebhookHandler {
    async fn process(&self, action: &StepAction, _ctx: &StepContext) -> Result<Value, StepError> {
        let config = match action {
            StepAction::Webhook(config) => config,
            other => return Err(StepError::kind_mismatch(StepKind::Webhook, other.kind())),
        };

        let method = Self::method(config)?;
        let mut request = self.client.request(method.clone(), &config.url);

        if let Some(headers) = &config.headers {
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }
        if let Some(body) = &config.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        debug!(url = %config.url, %method, status, "webhook delivered");

        Ok(json!({
            "url": config.url,
            "method": method.as_str(),
            "status": status,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(method: Option<&str>) -> WebhookConfig {
        WebhookConfig {
            url: "https://example.com/hook".into(),
            method: method.map(str::to_owned),
            headers: None,
            body: None,
        }
    }

    #[test]
    fn method_defaults_to_post_and_is_case_insensitive() {
        assert_eq!(WebhookHandler::method(&webhook(None)).unwrap(), Method::POST);
        assert_eq!(
            WebhookHandler::method(&webhook(Some("get"))).unwrap(),
            Method::GET
        );
    }

    #[test]
    fn garbage_method_is_a_config_error() {
        let result = WebhookHandler::method(&webhook(Some("GE T")));
        assert!(matches!(result, Err(StepError::Config(_))));
    }
}
