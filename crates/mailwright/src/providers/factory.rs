use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};

use super::{
    base::Provider,
    configs::{GeminiProviderConfig, OpenAiProviderConfig, ProviderConfig},
    gemini::{GeminiProvider, GEMINI_HOST, GEMINI_MODEL},
    openai::{OpenAiProvider, OPENAI_HOST, OPENAI_MODEL},
};
use crate::errors::ProviderResult;

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    OpenAi,
}

impl ProviderType {
    pub fn default_host(&self) -> &'static str {
        match self {
            ProviderType::Gemini => GEMINI_HOST,
            ProviderType::OpenAi => OPENAI_HOST,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Gemini => GEMINI_MODEL,
            ProviderType::OpenAi => OPENAI_MODEL,
        }
    }

    /// Config for this provider, filling unset host and model with defaults
    pub fn config(&self, api_key: String, host: Option<String>, model: Option<String>) -> ProviderConfig {
        let host = host.unwrap_or_else(|| self.default_host().to_string());
        let model = model.unwrap_or_else(|| self.default_model().to_string());
        match self {
            ProviderType::Gemini => ProviderConfig::Gemini(GeminiProviderConfig {
                host,
                api_key,
                model,
            }),
            ProviderType::OpenAi => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
            }),
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
    match config {
        ProviderConfig::Gemini(gemini_config) => Ok(Arc::new(GeminiProvider::new(gemini_config)?)),
        ProviderConfig::OpenAi(openai_config) => Ok(Arc::new(OpenAiProvider::new(openai_config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_round_trip() {
        for provider_type in ProviderType::iter() {
            let name = provider_type.to_string();
            assert_eq!(ProviderType::from_str(&name).unwrap(), provider_type);
        }
        assert_eq!(ProviderType::OpenAi.to_string(), "openai");
    }

    #[test]
    fn test_config_defaults() {
        match ProviderType::Gemini.config("key".into(), None, None) {
            ProviderConfig::Gemini(config) => {
                assert_eq!(config.host, GEMINI_HOST);
                assert_eq!(config.model, "gemini-2.5-flash");
                assert_eq!(config.api_key, "key");
            }
            other => panic!("unexpected config: {:?}", other),
        }

        match ProviderType::OpenAi.config("key".into(), Some("http://localhost:9000".into()), None) {
            ProviderConfig::OpenAi(config) => {
                assert_eq!(config.host, "http://localhost:9000");
                assert_eq!(config.model, OPENAI_MODEL);
            }
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_get_provider() {
        for provider_type in ProviderType::iter() {
            assert!(get_provider(provider_type.config("key".into(), None, None)).is_ok());
        }
    }
}
