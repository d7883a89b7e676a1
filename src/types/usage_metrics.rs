//! Token usage accounting for LLM calls, tasks and crews.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage accumulated over one or more LLM requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Total number of tokens used.
    pub total_tokens: i64,
    /// Number of tokens used in prompts.
    pub prompt_tokens: i64,
    /// Number of cached prompt tokens used.
    pub cached_prompt_tokens: i64,
    /// Number of tokens used in completions.
    pub completion_tokens: i64,
    /// Number of successful requests made.
    pub successful_requests: i64,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `usage` object of an OpenAI-compatible chat completion.
    ///
    /// Counts as one successful request. `total_tokens` falls back to
    /// prompt + completion when the provider omits it.
    pub fn from_openai_usage(usage: &Value) -> Self {
        let field = |name: &str| usage.get(name).and_then(Value::as_i64).unwrap_or(0);

        let prompt_tokens = field("prompt_tokens");
        let completion_tokens = field("completion_tokens");
        let total_tokens = usage
            .get("total_tokens")
            .and_then(Value::as_i64)
            .unwrap_or(prompt_tokens + completion_tokens);
        let cached_prompt_tokens = usage
            .get("prompt_tokens_details")
            .and_then(|d| d.get("cached_tokens"))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        Self {
            total_tokens,
            prompt_tokens,
            cached_prompt_tokens,
            completion_tokens,
            successful_requests: 1,
        }
    }

    /// Add usage metrics from another UsageMetrics object.
    pub fn add_usage_metrics(&mut self, other: &UsageMetrics) {
        self.total_tokens += other.total_tokens;
        self.prompt_tokens += other.prompt_tokens;
        self.cached_prompt_tokens += other.cached_prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.successful_requests += other.successful_requests;
    }
}

impl std::iter::Sum for UsageMetrics {
    fn sum<I: Iterator<Item = UsageMetrics>>(iter: I) -> Self {
        iter.fold(UsageMetrics::new(), |mut acc, item| {
            acc.add_usage_metrics(&item);
            acc
        })
    }
}
