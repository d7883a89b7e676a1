//! OpenAI native completion provider.
//!
//! Talks to the Chat Completions API (`POST {base_url}/chat/completions`)
//! through `reqwest`. Any OpenAI-compatible endpoint works by overriding the
//! base URL.
//!
//! # Features
//!
//! - Bearer authentication with optional organization header
//! - Retry with exponential backoff on transport errors, 429 and 5xx
//! - Stop sequences (sent to the API and re-applied locally)
//! - Token usage extraction

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llms::base_llm::{
    apply_stop_words, generate_call_id, BaseLLM, LLMError, LLMMessage, LLMResponse,
};
use crate::types::usage_metrics::UsageMetrics;

/// Default API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "openai";
const MAX_STOP_SEQUENCES: usize = 4;

/// OpenAI chat completion client.
#[derive(Clone)]
pub struct OpenAICompletion {
    /// OpenAI model name (e.g. "gpt-4").
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Maximum tokens in response.
    pub max_tokens: Option<u32>,
    /// API root without trailing slash.
    pub base_url: String,
    /// Organization ID for multi-tenant access.
    pub organization: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub initial_backoff: Duration,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl fmt::Debug for OpenAICompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAICompletion")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl OpenAICompletion {
    /// Create a new OpenAI completion provider.
    ///
    /// # Arguments
    ///
    /// * `model` - OpenAI model name (e.g., "gpt-4", "gpt-4o-mini").
    /// * `api_key` - API key; requests fail with [`LLMError::MissingApiKey`] without one.
    /// * `base_url` - Optional custom base URL.
    pub fn new(
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            organization: None,
            timeout: Duration::from_secs(120),
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    /// Full URL of the chat completions endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the Chat Completions API.
    pub fn build_request_body(&self, messages: &[LLMMessage], stop: &[String]) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        // The API rejects more than four stop sequences.
        if !stop.is_empty() {
            let stop: Vec<&String> = stop.iter().take(MAX_STOP_SEQUENCES).collect();
            body["stop"] = serde_json::json!(stop);
        }

        body
    }

    /// Parse a Chat Completions API response.
    pub fn parse_completion(
        &self,
        response: &Value,
        stop: &[String],
    ) -> Result<LLMResponse, LLMError> {
        let message = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| LLMError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "no choices[0].message in response".to_string(),
            })?;

        // `content` is null when the model refuses or only calls tools.
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or("");

        let usage = response.get("usage").map(UsageMetrics::from_openai_usage);
        if let Some(ref usage) = usage {
            log::debug!(
                "OpenAI token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens,
            );
        }

        Ok(LLMResponse {
            content: apply_stop_words(content, stop),
            usage,
        })
    }
}

#[async_trait]
impl BaseLLM for OpenAICompletion {
    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    fn get_context_window_size(&self) -> usize {
        let model = self.model.as_str();
        if model.contains("gpt-4.1") {
            1_047_576
        } else if model.contains("gpt-5") || model.contains("o3") || model.contains("o4-mini") {
            200_000
        } else if model.contains("gpt-4o")
            || model.contains("gpt-4-turbo")
            || model.contains("o1")
        {
            128_000
        } else if model.contains("gpt-4-32k") {
            32_768
        } else if model.contains("gpt-4") {
            8_192
        } else if model.contains("gpt-3.5-turbo") {
            16_385
        } else {
            crate::llms::base_llm::DEFAULT_CONTEXT_WINDOW_SIZE
        }
    }

    async fn acall(
        &self,
        messages: &[LLMMessage],
        stop: &[String],
    ) -> Result<LLMResponse, LLMError> {
        let api_key = self.api_key.as_deref().ok_or(LLMError::MissingApiKey)?;

        let call_id = generate_call_id();
        log::debug!(
            "OpenAICompletion.acall: model={}, messages={}, call_id={}",
            self.model,
            messages.len(),
            call_id,
        );

        let body = self.build_request_body(messages, stop);
        let endpoint = self.endpoint();

        let mut last_error = String::new();
        let mut retry_delay = self.initial_backoff;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!(
                    "OpenAI API retry attempt {} after {:?} (call_id={}): {}",
                    attempt,
                    retry_delay,
                    call_id,
                    last_error
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let mut request = self
                .client
                .post(&endpoint)
                .timeout(self.timeout)
                .bearer_auth(api_key)
                .json(&body);
            if let Some(ref org) = self.organization {
                request = request.header("OpenAI-Organization", org);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                // A malformed request will not get better on retry.
                Err(e) if e.is_builder() => return Err(LLMError::Transport(e)),
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                last_error = "Rate limited by OpenAI API (429)".to_string();
                continue;
            }
            if status.is_server_error() {
                last_error = format!("OpenAI API server error: {}", status);
                continue;
            }

            let response_text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            if !status.is_success() {
                return Err(LLMError::Api {
                    provider: PROVIDER.to_string(),
                    status: status.as_u16(),
                    body: response_text,
                });
            }

            let response_json: Value =
                serde_json::from_str(&response_text).map_err(|e| LLMError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!(
                        "{} - Body: {}",
                        e,
                        response_text.chars().take(500).collect::<String>()
                    ),
                })?;

            let parsed = self.parse_completion(&response_json, stop)?;
            log::debug!("OpenAI call completed: call_id={}", call_id);
            return Ok(parsed);
        }

        Err(LLMError::RetriesExhausted {
            provider: PROVIDER.to_string(),
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAICompletion {
        OpenAICompletion::new("gpt-4", Some("sk-test".to_string()), None).with_temperature(0.7)
    }

    #[test]
    fn test_build_request_body() {
        let llm = provider();
        let messages = vec![LLMMessage::system("be brief"), LLMMessage::user("hi")];
        let body = llm.build_request_body(&messages, &["\nObservation:".to_string()]);

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["stop"][0], "\nObservation:");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_build_request_body_caps_stop_sequences() {
        let llm = provider();
        let stop: Vec<String> = (0..6).map(|i| format!("S{}", i)).collect();
        let body = llm.build_request_body(&[], &stop);
        assert_eq!(body["stop"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_completion() {
        let llm = provider();
        let response = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Thought: ok\nFinal Answer: 42"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        });
        let parsed = llm.parse_completion(&response, &[]).unwrap();
        assert_eq!(parsed.content, "Thought: ok\nFinal Answer: 42");
        assert_eq!(parsed.usage.unwrap().total_tokens, 20);
    }

    #[test]
    fn test_parse_completion_applies_stop_words() {
        let llm = provider();
        let response = serde_json::json!({
            "choices": [{"message": {"content": "Action: search\nAction Input: x\nObservation: made up"}}]
        });
        let parsed = llm
            .parse_completion(&response, &["\nObservation:".to_string()])
            .unwrap();
        assert_eq!(parsed.content, "Action: search\nAction Input: x");
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let llm = provider();
        let err = llm
            .parse_completion(&serde_json::json!({"error": "nope"}), &[])
            .unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse { .. }));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let llm = OpenAICompletion::new("gpt-4", None, Some("http://localhost:8080/v1/".into()));
        assert_eq!(llm.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_context_window_size() {
        assert_eq!(provider().get_context_window_size(), 8_192);
        let llm = OpenAICompletion::new("gpt-4o-mini", None, None);
        assert_eq!(llm.get_context_window_size(), 128_000);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let rendered = format!("{:?}", provider());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("has_api_key: true"));
    }

    #[tokio::test]
    async fn test_acall_with_malformed_base_url_is_transport_error() {
        let llm = OpenAICompletion::new("gpt-4", Some("sk-test".into()), Some("not a url".into()))
            .with_max_retries(3);
        let err = llm.acall(&[LLMMessage::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, LLMError::Transport(_)));
        assert!(err.to_string().starts_with("HTTP transport error:"));
    }

    #[tokio::test]
    async fn test_acall_without_key_fails_fast() {
        let llm = OpenAICompletion::new("gpt-4", None, None);
        let err = llm.acall(&[LLMMessage::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, LLMError::MissingApiKey));
    }
}
