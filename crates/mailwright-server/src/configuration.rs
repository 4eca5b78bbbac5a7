use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use mailwright::providers::{configs::ProviderConfig, factory::ProviderType};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by CORS; any origin when unset
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: None,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    Gemini {
        api_key: String,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    OpenAi {
        api_key: String,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::Gemini { .. } => ProviderType::Gemini,
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
        }
    }

    // Convert to the mailwright ProviderConfig, filling per-provider defaults
    pub fn into_config(self) -> ProviderConfig {
        let provider_type = self.provider_type();
        match self {
            ProviderSettings::Gemini {
                api_key,
                host,
                model,
            }
            | ProviderSettings::OpenAi {
                api_key,
                host,
                model,
            } => provider_type.config(api_key, host, model),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            upstream_timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

impl GenerationSettings {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default(
                "generation.upstream_timeout_secs",
                default_upstream_timeout_secs(),
            )?
            .add_source(
                Environment::with_prefix("MAILWRIGHT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(field) = missing_field(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&provider_path(field)),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&provider_path(field)),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

// "missing field `api_key`" -> "api_key"
fn missing_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split_once('`').map(|(field, _)| field)
}

// Every other section has defaults, so a bare missing field belongs to the provider
fn provider_path(field: &str) -> String {
    match field {
        "provider" => "provider.type".to_string(),
        field if field.contains('.') => field.to_string(),
        field => format!("provider.{}", field),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("MAILWRIGHT_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("MAILWRIGHT_PROVIDER__TYPE", "gemini");
        env::set_var("MAILWRIGHT_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3001);
        assert_eq!(settings.server.allowed_origin, None);
        assert_eq!(settings.generation.upstream_timeout(), Duration::from_secs(30));

        match settings.provider.into_config() {
            ProviderConfig::Gemini(config) => {
                assert_eq!(config.host, "https://generativelanguage.googleapis.com");
                assert_eq!(config.api_key, "test-key");
                assert_eq!(config.model, "gemini-2.5-flash");
            }
            other => panic!("Expected Gemini provider, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("MAILWRIGHT_SERVER__PORT", "8080");
        env::set_var("MAILWRIGHT_SERVER__ALLOWED_ORIGIN", "http://localhost:3000");
        env::set_var("MAILWRIGHT_PROVIDER__TYPE", "openai");
        env::set_var("MAILWRIGHT_PROVIDER__API_KEY", "test-key");
        env::set_var("MAILWRIGHT_PROVIDER__HOST", "https://custom.openai.com");
        env::set_var("MAILWRIGHT_PROVIDER__MODEL", "gpt-4o");
        env::set_var("MAILWRIGHT_GENERATION__UPSTREAM_TIMEOUT_SECS", "5");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(
            settings.server.allowed_origin.as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(settings.generation.upstream_timeout_secs, 5);
        assert_eq!(settings.provider.provider_type(), ProviderType::OpenAi);

        match settings.provider.into_config() {
            ProviderConfig::OpenAi(config) => {
                assert_eq!(config.host, "https://custom.openai.com");
                assert_eq!(config.model, "gpt-4o");
            }
            other => panic!("Expected OpenAI provider, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();
        env::set_var("MAILWRIGHT_PROVIDER__TYPE", "gemini");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "MAILWRIGHT_PROVIDER__API_KEY");
            }
            other => panic!("Expected missing env var error, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    fn test_missing_field_parsing() {
        assert_eq!(missing_field("missing field `api_key`"), Some("api_key"));
        assert_eq!(missing_field("invalid type: string"), None);
        assert_eq!(provider_path("type"), "provider.type");
        assert_eq!(provider_path("provider"), "provider.type");
        assert_eq!(provider_path("server.port"), "server.port");
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3001,
            allowed_origin: None,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3001");

        let bad = ServerSettings {
            host: "not a host".to_string(),
            ..ServerSettings::default()
        };
        assert!(matches!(bad.socket_addr(), Err(ConfigError::InvalidAddress(_))));
    }
}
