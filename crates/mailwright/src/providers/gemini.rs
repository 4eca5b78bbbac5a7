use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{FragmentStream, GenerationOptions, Provider};
use super::configs::GeminiProviderConfig;
use super::utils::{check_error_payload, ensure_success, sse_text_fragments};
use crate::errors::{ProviderError, ProviderResult};

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Google generative-language API
pub struct GeminiProvider {
    client: Client,
    config: GeminiProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.host.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    fn payload(prompt: &str, options: &GenerationOptions) -> Value {
        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = options.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = options.max_output_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }

        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": generation_config
        })
    }

    async fn post(&self, url: &str, payload: &Value) -> ProviderResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(payload)
            .send()
            .await?;

        ensure_success(response).await
    }
}

/// Concatenate `candidates[0].content.parts[*].text`
pub fn response_text(value: &Value) -> ProviderResult<Option<String>> {
    check_error_payload(value)?;

    let parts = value
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    Ok(parts.map(|parts| {
        parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect::<String>()
    }))
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> ProviderResult<String> {
        let payload = Self::payload(prompt, options);
        let response = self.post(&self.url("generateContent"), &payload).await?;
        let body: Value = response.json().await?;

        match response_text(&body)? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProviderError::EmptyResponse),
        }
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<FragmentStream> {
        let payload = Self::payload(prompt, options);
        let url = format!("{}?alt=sse", self.url("streamGenerateContent"));
        let response = self.post(&url, &payload).await?;

        Ok(sse_text_fragments(response, response_text))
    }
}
