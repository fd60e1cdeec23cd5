//! The single provider round trip shared by every flow.
//!
//! Rendered prompt in, schema-checked JSON out. Timeouts, provider errors,
//! and unusable responses all come back as [`FlowError`].

use std::sync::Arc;
use std::time::Duration;

use curalink_config::AppConfig;
use curalink_core::{Message, Provider, ProviderRequest, ResponseSchema, Schema};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::FlowError;
use crate::template::Rendered;

/// Sampling and timeout settings applied to every flow call.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl FlowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            temperature: config.flows.temperature,
            max_tokens: Some(config.flows.max_tokens),
            timeout: Duration::from_secs(config.flows.timeout_secs),
        }
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Sends rendered prompts to the configured provider.
pub struct FlowRunner {
    provider: Arc<dyn Provider>,
    settings: FlowSettings,
}

impl FlowRunner {
    pub fn new(provider: Arc<dyn Provider>, settings: FlowSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Run one generation and return the output record.
    #[instrument(skip_all, fields(flow = flow, provider = %self.provider.name()))]
    pub async fn generate(
        &self,
        flow: &str,
        output: &Schema,
        prompt: Rendered,
    ) -> Result<Value, FlowError> {
        let message = Message::user(prompt.text).with_attachments(prompt.media);
        let request = ProviderRequest {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_schema: Some(ResponseSchema {
                name: flow.to_string(),
                schema: output.to_json_schema(),
            }),
            ..ProviderRequest::new(&self.settings.model, vec![message])
        };

        let response = tokio::time::timeout(self.settings.timeout, self.provider.complete(request))
            .await
            .map_err(|_| FlowError::Timeout(self.settings.timeout))??;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                total_tokens = usage.total_tokens,
                "Generation complete"
            );
        }

        let value = extract_json(&response.message.content)?;
        output.validate(&value).map_err(FlowError::InvalidOutput)?;
        Ok(value)
    }
}

/// Pull the JSON object out of a model reply.
///
/// Models sometimes wrap structured output in code fences or a sentence of
/// preamble; everything outside the outermost braces is ignored.
pub fn extract_json(content: &str) -> Result<Value, FlowError> {
    let start = content.find('{').ok_or(FlowError::NoJson)?;
    let end = content.rfind('}').ok_or(FlowError::NoJson)?;
    if end < start {
        return Err(FlowError::NoJson);
    }
    Ok(serde_json::from_str(&content[start..=end])?)
}
