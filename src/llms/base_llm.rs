//! Base LLM trait and shared message/response types.
//!
//! Every model the agents talk to implements [`BaseLLM`]. The trait is
//! object safe (`Arc<dyn BaseLLM>`), so one client can be shared by all
//! agents of a crew, including agents whose tasks run concurrently.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::usage_metrics::UsageMetrics;

/// Default context window size in tokens.
pub const DEFAULT_CONTEXT_WINDOW_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMMessage {
    /// Role of the message sender ("system", "user", "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Text reply from a model plus the usage reported for the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by LLM clients.
#[derive(Debug, Error)]
pub enum LLMError {
    /// No API key was configured.
    #[error("Missing OPENAI_API_KEY environment variable")]
    MissingApiKey,

    /// Connection, TLS or timeout failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-retryable error status.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// The provider answered 2xx with a body we could not use.
    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    /// Every attempt hit a retryable failure.
    #[error("{provider} API call failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        provider: String,
        attempts: u32,
        last_error: String,
    },
}

// ---------------------------------------------------------------------------
// BaseLLM trait
// ---------------------------------------------------------------------------

/// Interface for chat-completion models.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Get the model identifier/name.
    fn model(&self) -> &str;

    /// Get the optional temperature setting.
    fn temperature(&self) -> Option<f64>;

    /// Stop sequences configured on the client itself.
    fn stop(&self) -> &[String] {
        &[]
    }

    /// Get the provider name.
    fn provider(&self) -> &str {
        "openai"
    }

    /// Whether the provider honours the `stop` request parameter.
    fn supports_stop_words(&self) -> bool {
        true
    }

    /// Get the context window size for the model.
    fn get_context_window_size(&self) -> usize {
        DEFAULT_CONTEXT_WINDOW_SIZE
    }

    /// Send a conversation and return the model's reply.
    ///
    /// `stop` holds sequences at which generation must end. Implementations
    /// that cannot pass them to the provider truncate the reply locally via
    /// [`apply_stop_words`].
    async fn acall(
        &self,
        messages: &[LLMMessage],
        stop: &[String],
    ) -> Result<LLMResponse, LLMError>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate a unique call ID used to correlate log lines of one request.
pub fn generate_call_id() -> String {
    Uuid::new_v4().to_string()
}

/// Truncate `content` at the earliest occurrence of any stop word.
pub fn apply_stop_words(content: &str, stop: &[String]) -> String {
    if stop.is_empty() || content.is_empty() {
        return content.to_string();
    }

    let earliest = stop
        .iter()
        .filter(|word| !word.is_empty())
        .filter_map(|word| content.find(word.as_str()).map(|pos| (pos, word)))
        .min_by_key(|(pos, _)| *pos);

    match earliest {
        Some((pos, word)) => {
            log::debug!("Applied stop word '{}' at position {}", word.trim(), pos);
            content[..pos].trim().to_string()
        }
        None => content.to_string(),
    }
}
