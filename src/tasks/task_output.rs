//! Task output representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::llms::base_llm::LLMMessage;
use crate::types::usage_metrics::UsageMetrics;

/// The result of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Description of the task.
    pub description: String,
    /// Name of the task.
    pub name: Option<String>,
    /// Expected output of the task.
    pub expected_output: Option<String>,
    /// Summary of the task (auto-generated from description).
    pub summary: Option<String>,
    /// Raw output of the task.
    pub raw: String,
    /// Role of the agent that executed the task.
    pub agent: String,
    /// Messages of the task.
    #[serde(default)]
    pub messages: Vec<LLMMessage>,
    #[serde(default)]
    pub token_usage: UsageMetrics,
}

impl TaskOutput {
    /// Create a new TaskOutput with summary auto-generated from description.
    pub fn new(description: String, agent: String, raw: String) -> Self {
        let summary = Self::generate_summary(&description);
        Self {
            description,
            name: None,
            expected_output: None,
            summary: Some(summary),
            raw,
            agent,
            messages: Vec::new(),
            token_usage: UsageMetrics::default(),
        }
    }

    /// First 10 words of the description followed by "...".
    fn generate_summary(description: &str) -> String {
        let excerpt: String = description
            .split_whitespace()
            .take(10)
            .collect::<Vec<&str>>()
            .join(" ");
        format!("{}...", excerpt)
    }

    /// Parse the raw output as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(self.raw.trim()).ok()
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
