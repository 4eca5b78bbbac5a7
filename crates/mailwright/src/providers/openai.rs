use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{FragmentStream, GenerationOptions, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{check_error_payload, ensure_success, sse_text_fragments};
use crate::errors::{ProviderError, ProviderResult};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, prompt: &str, options: &GenerationOptions, stream: bool) -> Value {
        let mut payload = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": stream,
        });

        if let Some(object) = payload.as_object_mut() {
            if let Some(temp) = options.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
            if let Some(tokens) = options.max_output_tokens {
                object.insert("max_tokens".to_string(), json!(tokens));
            }
        }
        payload
    }

    async fn post(&self, payload: &Value) -> ProviderResult<reqwest::Response> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        ensure_success(response).await
    }
}

fn message_text(value: &Value) -> ProviderResult<Option<String>> {
    check_error_payload(value)?;
    Ok(value
        .pointer("/choices/0/message/content")
        .and_then(|content| content.as_str())
        .map(str::to_string))
}

fn delta_text(value: &Value) -> ProviderResult<Option<String>> {
    check_error_payload(value)?;
    Ok(value
        .pointer("/choices/0/delta/content")
        .and_then(|content| content.as_str())
        .map(str::to_string))
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> ProviderResult<String> {
        let response = self.post(&self.payload(prompt, options, false)).await?;
        let body: Value = response.json().await?;

        match message_text(&body)? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProviderError::EmptyResponse),
        }
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<FragmentStream> {
        let response = self.post(&self.payload(prompt, options, true)).await?;
        Ok(sse_text_fragments(response, delta_text))
    }
}
