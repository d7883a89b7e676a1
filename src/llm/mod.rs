//! LLM configuration and construction.
//!
//! [`LLM`] holds the model configuration taken from [`Settings`];
//! [`create_llm`] turns it into a shareable provider client. The HTTP layer
//! goes through the [`LlmFactory`] trait so each request gets a fresh client
//! (and tests can hand out scripted models instead).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llms::base_llm::{BaseLLM, LLMError};
use crate::llms::providers::openai::OpenAICompletion;
use crate::utilities::config::Settings;

/// Model configuration for the agents' language model.
#[derive(Clone, Serialize, Deserialize)]
pub struct LLM {
    /// Model name, optionally prefixed with a provider (`openai/gpt-4`).
    pub model: String,
    pub temperature: Option<f64>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

impl std::fmt::Debug for LLM {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLM")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LLM {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            api_key: None,
            base_url: None,
            organization: None,
            timeout: None,
            max_retries: None,
        }
    }

    /// Configuration derived from service settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.openai_model.clone(),
            temperature: Some(settings.openai_temperature),
            api_key: settings.openai_api_key.clone(),
            base_url: Some(settings.openai_base_url.clone()),
            organization: settings.openai_organization.clone(),
            timeout: Some(Duration::from_secs(settings.llm_timeout_secs)),
            max_retries: Some(settings.llm_max_retries),
        }
    }

    /// Split `provider/model` into its parts; bare names default to OpenAI.
    pub fn provider_and_model(&self) -> (&str, &str) {
        match self.model.split_once('/') {
            Some((provider, model)) => (provider, model),
            None => ("openai", self.model.as_str()),
        }
    }

    /// Build the provider client for this configuration.
    pub fn build(&self) -> Result<Arc<dyn BaseLLM>, LLMError> {
        if self.api_key.is_none() {
            return Err(LLMError::MissingApiKey);
        }

        let (provider, model) = self.provider_and_model();
        let model = match provider.to_lowercase().as_str() {
            "openai" => model,
            other => {
                // Any other prefix is assumed to be an OpenAI-compatible gateway.
                log::warn!(
                    "Unknown provider '{}', falling back to OpenAI-compatible",
                    other
                );
                self.model.as_str()
            }
        };

        let mut client = OpenAICompletion::new(model, self.api_key.clone(), self.base_url.clone());
        if let Some(temperature) = self.temperature {
            client = client.with_temperature(temperature);
        }
        if let Some(timeout) = self.timeout {
            client = client.with_timeout(timeout);
        }
        if let Some(max_retries) = self.max_retries {
            client = client.with_max_retries(max_retries);
        }
        client = client.with_organization(self.organization.clone());

        log::debug!("Created LLM client: model={}", client.model);
        Ok(Arc::new(client))
    }
}

/// Initialize the language model from settings.
///
/// Fails with [`LLMError::MissingApiKey`] when `OPENAI_API_KEY` is unset.
pub fn create_llm(settings: &Settings) -> Result<Arc<dyn BaseLLM>, LLMError> {
    LLM::from_settings(settings).build()
}

/// Source of LLM clients for request handlers.
pub trait LlmFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn BaseLLM>, LLMError>;
}

/// Production factory: one OpenAI client per call, configured from settings.
#[derive(Debug, Clone)]
pub struct SettingsLlmFactory {
    settings: Settings,
}

impl SettingsLlmFactory {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl LlmFactory for SettingsLlmFactory {
    fn create(&self) -> Result<Arc<dyn BaseLLM>, LLMError> {
        create_llm(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_llm_requires_api_key() {
        let settings = Settings::default();
        let err = create_llm(&settings).unwrap_err();
        assert_eq!(err.to_string(), "Missing OPENAI_API_KEY environment variable");
    }

    #[test]
    fn test_create_llm_uses_settings() {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            ..Settings::default()
        };
        let llm = create_llm(&settings).unwrap();
        assert_eq!(llm.model(), "gpt-4");
        assert_eq!(llm.temperature(), Some(0.7));
        assert_eq!(llm.provider(), "openai");
    }

    #[test]
    fn test_organization_comes_from_settings() {
        let settings = Settings {
            openai_organization: Some("org-123".to_string()),
            ..Settings::default()
        };
        let config = LLM::from_settings(&settings);
        assert_eq!(config.organization.as_deref(), Some("org-123"));
        assert!(LLM::new("gpt-4").organization.is_none());
    }

    #[test]
    fn test_provider_prefix_is_stripped() {
        let mut config = LLM::new("openai/gpt-4o-mini");
        config.api_key = Some("sk-test".to_string());
        assert_eq!(config.provider_and_model(), ("openai", "gpt-4o-mini"));
        assert_eq!(config.build().unwrap().model(), "gpt-4o-mini");
    }

    #[test]
    fn test_debug_and_serialize_hide_api_key() {
        let mut config = LLM::new("gpt-4");
        config.api_key = Some("sk-secret".to_string());
        assert!(!format!("{:?}", config).contains("sk-secret"));
        assert!(!serde_json::to_string(&config).unwrap().contains("sk-secret"));
    }

    #[test]
    fn test_settings_factory() {
        let factory = SettingsLlmFactory::new(Settings::default());
        assert!(matches!(factory.create(), Err(LLMError::MissingApiKey)));
    }
}
