use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderResult;

/// Text fragments in the order the generation service produced them
pub type FragmentStream = BoxStream<'static, ProviderResult<String>>;

/// Sampling parameters for a single call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Base trait for text-generation services (Gemini, OpenAI, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the whole response text for a prompt
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> ProviderResult<String>;

    /// Start generating and return the response as it is produced.
    ///
    /// An error here means nothing was generated; errors inside the stream
    /// mean generation broke off part way.
    async fn stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<FragmentStream>;
}
