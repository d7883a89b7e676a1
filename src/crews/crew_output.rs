//! Crew output representation.
//!
//! The result of a crew kickoff: the final task's raw text, every task's
//! output, and the token usage summed over all of them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tasks::task_output::TaskOutput;
use crate::types::usage_metrics::UsageMetrics;

/// Class that represents the result of a crew.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Raw output of the final task.
    pub raw: String,
    /// Output of each task, in declaration order.
    pub tasks_output: Vec<TaskOutput>,
    /// Processed token summary.
    pub token_usage: UsageMetrics,
}

impl CrewOutput {
    /// Build the crew output from task outputs in declaration order.
    pub fn from_task_outputs(tasks_output: Vec<TaskOutput>) -> Self {
        let raw = tasks_output
            .last()
            .map(|output| output.raw.clone())
            .unwrap_or_default();
        let token_usage = tasks_output
            .iter()
            .map(|output| output.token_usage.clone())
            .sum();
        Self {
            raw,
            tasks_output,
            token_usage,
        }
    }

    /// Raw output of the task at `index`, if it ran.
    pub fn task_raw(&self, index: usize) -> Option<&str> {
        self.tasks_output.get(index).map(|output| output.raw.as_str())
    }

    /// Parse the final output as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(self.raw.trim()).ok()
    }
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
