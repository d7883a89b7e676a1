//! Task definition and execution.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::agent::{Agent, AgentError};
use crate::tasks::task_output::TaskOutput;
use crate::utilities::errors::InterpolationError;
use crate::utilities::string_utils::interpolate_only;

/// Errors raised while executing a task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task '{description}' failed: {source}")]
    Execution {
        description: String,
        #[source]
        source: AgentError,
    },
}

/// Represents a task to be executed.
///
/// Each task has a description, an expected output, and the role of the
/// agent responsible for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Optional name for the task.
    pub name: Option<String>,
    /// Descriptive text detailing the task's purpose and execution.
    pub description: String,
    /// Clear definition of expected task outcome.
    pub expected_output: String,
    /// Role of the agent responsible for execution.
    pub agent: Option<String>,
    /// IDs of other tasks whose output is given as context.
    pub context: Option<Vec<Uuid>>,
    /// Whether the task runs concurrently with the tasks that follow it.
    pub async_execution: bool,
    pub output: Option<TaskOutput>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    #[serde(skip)]
    original_description: Option<String>,
    #[serde(skip)]
    original_expected_output: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            description: description.into(),
            expected_output: expected_output.into(),
            agent: None,
            context: None,
            async_execution: false,
            output: None,
            start_time: None,
            end_time: None,
            original_description: None,
            original_expected_output: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_agent(mut self, role: impl Into<String>) -> Self {
        self.agent = Some(role.into());
        self
    }

    pub fn with_context(mut self, task_ids: Vec<Uuid>) -> Self {
        self.context = Some(task_ids);
        self
    }

    pub fn with_async_execution(mut self, async_execution: bool) -> Self {
        self.async_execution = async_execution;
        self
    }

    /// Generate the task prompt.
    pub fn prompt(&self) -> String {
        format!("{}\nExpected Output: {}", self.description, self.expected_output)
    }

    /// Run the task with `agent`, recording timing and output.
    pub async fn execute(
        &mut self,
        agent: &Agent,
        context: Option<&str>,
    ) -> Result<TaskOutput, TaskError> {
        self.start_time = Some(Utc::now());

        let execution = agent
            .execute_task(&self.prompt(), context)
            .await
            .map_err(|source| TaskError::Execution {
                description: self.description.clone(),
                source,
            })?;

        let mut output = TaskOutput::new(
            self.description.clone(),
            agent.role.clone(),
            execution.output,
        );
        output.name = self.name.clone();
        output.expected_output = Some(self.expected_output.clone());
        output.messages = execution.messages;
        output.token_usage = execution.usage;

        self.output = Some(output.clone());
        self.end_time = Some(Utc::now());

        log::debug!(
            "Task '{}' completed in {:.2}s",
            self.name.as_deref().unwrap_or(&self.description),
            self.execution_duration().unwrap_or_default()
        );
        Ok(output)
    }

    /// Run the task on a background tokio task.
    ///
    /// The handle resolves to the finished task, with `output` set.
    pub fn execute_async(
        &self,
        agent: Agent,
        context: Option<String>,
    ) -> tokio::task::JoinHandle<Result<Task, TaskError>> {
        let mut task = self.clone();
        tokio::spawn(async move {
            task.execute(&agent, context.as_deref()).await?;
            Ok(task)
        })
    }

    /// Execution duration in seconds, if both start and end times are set.
    pub fn execution_duration(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// Interpolate inputs into the description and expected output.
    ///
    /// The templates are kept, so repeated calls always start from them.
    pub fn interpolate_inputs(
        &mut self,
        inputs: &HashMap<String, String>,
    ) -> Result<(), InterpolationError> {
        let description = self
            .original_description
            .get_or_insert_with(|| self.description.clone());
        let expected_output = self
            .original_expected_output
            .get_or_insert_with(|| self.expected_output.clone());

        if inputs.is_empty() {
            return Ok(());
        }

        let description = interpolate_only(description, inputs)?;
        let expected_output = interpolate_only(expected_output, inputs)?;
        self.description = description;
        self.expected_output = expected_output;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llms::testing::ScriptedLLM;

    #[test]
    fn test_prompt() {
        let task = Task::new("Analyze the market", "A report");
        assert_eq!(task.prompt(), "Analyze the market\nExpected Output: A report");
    }

    #[test]
    fn test_interpolate_inputs() {
        let mut task = Task::new("Evaluate: {idea}", "Report on {idea}");
        let mut inputs = HashMap::new();
        inputs.insert("idea".to_string(), "CRM for plumbers".to_string());
        task.interpolate_inputs(&inputs).unwrap();
        assert_eq!(task.description, "Evaluate: CRM for plumbers");

        inputs.insert("idea".to_string(), "Dog walking app".to_string());
        task.interpolate_inputs(&inputs).unwrap();
        assert_eq!(task.expected_output, "Report on Dog walking app");
    }

    #[test]
    fn test_interpolate_missing_input() {
        let mut task = Task::new("Evaluate: {idea}", "Report");
        let inputs = HashMap::from([("other".to_string(), "x".to_string())]);
        assert!(task.interpolate_inputs(&inputs).is_err());
    }

    #[tokio::test]
    async fn test_execute_records_output() {
        let llm = Arc::new(ScriptedLLM::new(["Final Answer: All good"]));
        let agent = Agent::new("Tester", "Test", "Test").with_llm(llm);
        let mut task = Task::new("Check things", "A verdict").with_name("check");

        let output = task.execute(&agent, None).await.unwrap();
        assert_eq!(output.raw, "All good");
        assert_eq!(output.agent, "Tester");
        assert_eq!(output.name.as_deref(), Some("check"));
        assert_eq!(output.token_usage.successful_requests, 1);
        assert_eq!(task.output, Some(output));
        assert!(task.execution_duration().is_some());
    }

    #[tokio::test]
    async fn test_execute_async_returns_finished_task() {
        let llm = Arc::new(ScriptedLLM::new(["Final Answer: done"]));
        let agent = Agent::new("Tester", "Test", "Test").with_llm(llm);
        let task = Task::new("Background work", "Done").with_async_execution(true);

        let finished = task.execute_async(agent, None).await.unwrap().unwrap();
        assert_eq!(finished.id, task.id);
        assert_eq!(finished.output.unwrap().raw, "done");
    }

    #[tokio::test]
    async fn test_execute_error_names_task() {
        let agent = Agent::new("Tester", "Test", "Test");
        let mut task = Task::new("Orphan work", "Nothing");
        let err = task.execute(&agent, None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Task 'Orphan work' failed: Agent 'Tester' has no language model configured"
        );
    }
}
