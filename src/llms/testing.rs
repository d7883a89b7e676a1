//! Scripted model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::base_llm::{BaseLLM, LLMError, LLMMessage, LLMResponse};
use crate::types::usage_metrics::UsageMetrics;

/// Replies from a queue, or from a rule whose needle appears in the first
/// user message. Rules make replies deterministic when tasks run
/// concurrently. Every call is recorded.
#[derive(Debug, Default)]
pub(crate) struct ScriptedLLM {
    replies: Mutex<VecDeque<String>>,
    rules: Vec<(String, String)>,
    fail_with: Option<String>,
    calls: Mutex<Vec<Vec<LLMMessage>>>,
    stops: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLLM {
    pub(crate) fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn with_rule(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), reply.to_string()));
        self
    }

    /// Every call fails with an API error carrying `body`.
    pub(crate) fn failing(body: &str) -> Self {
        Self {
            fail_with: Some(body.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<LLMMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn stops(&self) -> Vec<Vec<String>> {
        self.stops.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseLLM for ScriptedLLM {
    fn model(&self) -> &str {
        "scripted"
    }

    fn temperature(&self) -> Option<f64> {
        None
    }

    async fn acall(
        &self,
        messages: &[LLMMessage],
        stop: &[String],
    ) -> Result<LLMResponse, LLMError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.stops.lock().unwrap().push(stop.to_vec());

        if let Some(body) = &self.fail_with {
            return Err(LLMError::Api {
                provider: "openai".to_string(),
                status: 401,
                body: body.clone(),
            });
        }

        let task = messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let content = match self.rules.iter().find(|(needle, _)| task.contains(needle)) {
            Some((_, reply)) => reply.clone(),
            None => self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "Final Answer: (script exhausted)".to_string()),
        };

        Ok(LLMResponse {
            content,
            usage: Some(UsageMetrics {
                total_tokens: 10,
                prompt_tokens: 7,
                cached_prompt_tokens: 0,
                completion_tokens: 3,
                successful_requests: 1,
            }),
        })
    }
}
