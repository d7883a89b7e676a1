//! Crew: a named group of agents and the tasks they work through.
//!
//! Tasks run in declaration order. A task marked `async_execution` is
//! spawned and runs alongside whatever follows it; the next synchronous task
//! (or the end of the list) waits for every pending async task first.

use std::collections::HashMap;
use std::fmt;

use futures::future::join_all;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::agent::Agent;
use crate::crews::crew_output::CrewOutput;
use crate::task::{Task, TaskError};
use crate::tasks::task_output::TaskOutput;
use crate::types::usage_metrics::UsageMetrics;
use crate::utilities::errors::InterpolationError;

/// Separator between task outputs in an implicit context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Errors raised while validating or running a crew.
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("Crew '{0}' has no tasks to execute")]
    NoTasks(String),

    #[error("Task '{0}' has no agent assigned")]
    NoAgent(String),

    #[error("Task '{task}' is assigned to unknown agent '{role}'")]
    UnknownAgent { task: String, role: String },

    #[error("Task '{task}' takes context from {context_id}, which is not an earlier task of this crew")]
    InvalidContext { task: String, context_id: Uuid },

    #[error("Failed to interpolate inputs: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("Async task '{task}' did not complete: {reason}")]
    Join { task: String, reason: String },
}

type PendingTask = (usize, JoinHandle<Result<Task, TaskError>>);

/// Represents a group of agents, defining how they should collaborate and
/// the tasks they should perform.
pub struct Crew {
    pub id: Uuid,
    pub name: String,
    pub agents: Vec<Agent>,
    pub tasks: Vec<Task>,
    /// Metrics for the LLM usage of the last kickoff.
    pub usage_metrics: Option<UsageMetrics>,
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("agents", &self.agents.iter().map(|a| &a.role).collect::<Vec<_>>())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crew(id={}, name={}, number_of_agents={}, number_of_tasks={})",
            self.id,
            self.name,
            self.agents.len(),
            self.tasks.len()
        )
    }
}

impl Crew {
    pub fn new(name: impl Into<String>, agents: Vec<Agent>, tasks: Vec<Task>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            agents,
            tasks,
            usage_metrics: None,
        }
    }

    /// Look up a registered agent by role.
    pub fn get_agent(&self, role: &str) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.role == role)
    }

    /// Execute the crew's workflow.
    ///
    /// `inputs` are interpolated into every task and agent before anything
    /// runs. The first failing task aborts the kickoff.
    #[tracing::instrument(skip_all, fields(crew = %self.name))]
    pub async fn kickoff(
        &mut self,
        inputs: Option<HashMap<String, String>>,
    ) -> Result<CrewOutput, CrewError> {
        if let Some(inputs) = &inputs {
            self.interpolate_inputs(inputs)?;
        }
        self.validate()?;

        tracing::info!(tasks = self.tasks.len(), agents = self.agents.len(), "Crew kickoff");
        let task_outputs = self.execute_tasks().await?;
        let output = CrewOutput::from_task_outputs(task_outputs);

        tracing::info!(
            total_tokens = output.token_usage.total_tokens,
            requests = output.token_usage.successful_requests,
            "Crew finished"
        );
        self.usage_metrics = Some(output.token_usage.clone());
        Ok(output)
    }

    fn interpolate_inputs(&mut self, inputs: &HashMap<String, String>) -> Result<(), CrewError> {
        for task in &mut self.tasks {
            task.interpolate_inputs(inputs)?;
        }
        for agent in &mut self.agents {
            agent.interpolate_inputs(inputs)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), CrewError> {
        if self.tasks.is_empty() {
            return Err(CrewError::NoTasks(self.name.clone()));
        }

        for (index, task) in self.tasks.iter().enumerate() {
            self.agent_for(task)?;
            for context_id in task.context.iter().flatten() {
                let earlier = self.tasks[..index].iter().any(|t| t.id == *context_id);
                if !earlier {
                    return Err(CrewError::InvalidContext {
                        task: task.description.clone(),
                        context_id: *context_id,
                    });
                }
            }
        }
        Ok(())
    }

    fn agent_for(&self, task: &Task) -> Result<&Agent, CrewError> {
        let role = task
            .agent
            .as_deref()
            .ok_or_else(|| CrewError::NoAgent(task.description.clone()))?;
        self.get_agent(role).ok_or_else(|| CrewError::UnknownAgent {
            task: task.description.clone(),
            role: role.to_string(),
        })
    }

    async fn execute_tasks(&mut self) -> Result<Vec<TaskOutput>, CrewError> {
        let mut outputs: Vec<Option<TaskOutput>> = vec![None; self.tasks.len()];
        let mut pending: Vec<PendingTask> = Vec::new();

        for index in 0..self.tasks.len() {
            let agent = self.agent_for(&self.tasks[index])?.clone();
            let task = &self.tasks[index];

            if task.async_execution && !self.depends_on_pending(task, &pending) {
                let context = self.task_context(index, &outputs);
                tracing::debug!(task = %task.description, agent = %agent.role, "Spawning async task");
                pending.push((index, task.execute_async(agent, context)));
                continue;
            }

            Self::join_pending(&mut self.tasks, &mut pending, &mut outputs).await?;

            let context = self.task_context(index, &outputs);
            let task = &mut self.tasks[index];
            tracing::debug!(task = %task.description, agent = %agent.role, "Executing task");
            let output = task.execute(&agent, context.as_deref()).await?;
            outputs[index] = Some(output);
        }

        Self::join_pending(&mut self.tasks, &mut pending, &mut outputs).await?;
        Ok(outputs.into_iter().flatten().collect())
    }

    fn depends_on_pending(&self, task: &Task, pending: &[PendingTask]) -> bool {
        task.context.iter().flatten().any(|id| {
            pending
                .iter()
                .any(|(index, _)| self.tasks[*index].id == *id)
        })
    }

    /// Context for the task at `index`.
    ///
    /// Explicit context lists the raw outputs of the named tasks. Without
    /// one, every output completed so far is used, in declaration order.
    fn task_context(&self, index: usize, outputs: &[Option<TaskOutput>]) -> Option<String> {
        let raws: Vec<&str> = match &self.tasks[index].context {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.tasks.iter().position(|t| t.id == *id))
                .filter_map(|pos| outputs[pos].as_ref())
                .map(|output| output.raw.as_str())
                .collect(),
            None => outputs
                .iter()
                .flatten()
                .map(|output| output.raw.as_str())
                .collect(),
        };

        if raws.is_empty() {
            None
        } else {
            Some(raws.join(CONTEXT_SEPARATOR))
        }
    }

    async fn join_pending(
        tasks: &mut [Task],
        pending: &mut Vec<PendingTask>,
        outputs: &mut [Option<TaskOutput>],
    ) -> Result<(), CrewError> {
        if pending.is_empty() {
            return Ok(());
        }

        let (indices, handles): (Vec<usize>, Vec<_>) = pending.drain(..).unzip();
        let results = join_all(handles).await;

        let mut first_error = None;
        for (index, result) in indices.into_iter().zip(results) {
            match result {
                Ok(Ok(finished)) => {
                    outputs[index] = finished.output.clone();
                    tasks[index] = finished;
                }
                Ok(Err(err)) => {
                    first_error.get_or_insert(CrewError::Task(err));
                }
                Err(err) => {
                    first_error.get_or_insert(CrewError::Join {
                        task: tasks[index].description.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llms::testing::ScriptedLLM;

    fn agent(role: &str, llm: &Arc<ScriptedLLM>) -> Agent {
        Agent::new(role, "goal", "backstory").with_llm(llm.clone())
    }

    #[tokio::test]
    async fn test_sequential_tasks_share_context() {
        let llm = Arc::new(ScriptedLLM::new(["Final Answer: first", "Final Answer: second"]));
        let tasks = vec![
            Task::new("Step one about {topic}", "one").with_agent("Worker"),
            Task::new("Step two", "two").with_agent("Worker"),
        ];
        let mut crew = Crew::new("test", vec![agent("Worker", &llm)], tasks);
        let inputs = HashMap::from([("topic".to_string(), "pets".to_string())]);

        let output = crew.kickoff(Some(inputs)).await.unwrap();
        assert_eq!(output.raw, "second");
        assert_eq!(output.tasks_output.len(), 2);
        assert_eq!(output.token_usage.successful_requests, 2);
        assert_eq!(crew.usage_metrics.as_ref().unwrap().successful_requests, 2);

        let calls = llm.calls();
        assert!(calls[0][1].content.contains("Step one about pets"));
        assert!(!calls[0][1].content.contains("Context:"));
        assert!(calls[1][1].content.contains("Context:\nfirst"));
    }

    #[tokio::test]
    async fn test_async_tasks_join_before_dependent_task() {
        let llm = Arc::new(
            ScriptedLLM::new(Vec::<String>::new())
                .with_rule("Market study", "Final Answer: market report")
                .with_rule("Tech study", "Final Answer: tech report")
                .with_rule("Business plan", "Final Answer: the plan"),
        );
        let market = Task::new("Market study", "m")
            .with_agent("Analyst")
            .with_async_execution(true);
        let tech = Task::new("Tech study", "t")
            .with_agent("Engineer")
            .with_async_execution(true);
        let plan = Task::new("Business plan", "p")
            .with_agent("Strategist")
            .with_context(vec![market.id, tech.id]);

        let mut crew = Crew::new(
            "validation",
            vec![agent("Analyst", &llm), agent("Engineer", &llm), agent("Strategist", &llm)],
            vec![market, tech, plan],
        );
        let output = crew.kickoff(None).await.unwrap();

        let raws: Vec<&str> = output.tasks_output.iter().map(|o| o.raw.as_str()).collect();
        assert_eq!(raws, vec!["market report", "tech report", "the plan"]);
        assert_eq!(output.raw, "the plan");
        assert!(crew.tasks.iter().all(|t| t.output.is_some()));

        let plan_call = llm
            .calls()
            .into_iter()
            .find(|call| call[1].content.contains("Business plan"))
            .unwrap();
        assert!(plan_call[1]
            .content
            .contains("Context:\nmarket report\n\n---\n\ntech report"));
    }

    #[tokio::test]
    async fn test_trailing_async_task_is_joined() {
        let llm = Arc::new(ScriptedLLM::new(["Final Answer: only"]));
        let task = Task::new("Lonely", "x")
            .with_agent("Worker")
            .with_async_execution(true);
        let mut crew = Crew::new("c", vec![agent("Worker", &llm)], vec![task]);
        let output = crew.kickoff(None).await.unwrap();
        assert_eq!(output.raw, "only");
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let llm = Arc::new(ScriptedLLM::new(Vec::<String>::new()));
        let task = Task::new("Orphan", "x").with_agent("Ghost");
        let mut crew = Crew::new("c", vec![agent("Worker", &llm)], vec![task]);
        let err = crew.kickoff(None).await.unwrap_err();
        assert_eq!(err.to_string(), "Task 'Orphan' is assigned to unknown agent 'Ghost'");
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_tasks() {
        let mut crew = Crew::new("empty", Vec::new(), Vec::new());
        assert!(matches!(crew.kickoff(None).await, Err(CrewError::NoTasks(_))));
    }

    #[tokio::test]
    async fn test_context_must_reference_earlier_task() {
        let llm = Arc::new(ScriptedLLM::new(Vec::<String>::new()));
        let later = Task::new("Later", "x").with_agent("Worker");
        let first = Task::new("First", "x")
            .with_agent("Worker")
            .with_context(vec![later.id]);
        let mut crew = Crew::new("c", vec![agent("Worker", &llm)], vec![first, later]);
        assert!(matches!(
            crew.kickoff(None).await,
            Err(CrewError::InvalidContext { .. })
        ));
    }

    #[tokio::test]
    async fn test_task_failure_aborts() {
        let llm = Arc::new(ScriptedLLM::failing("invalid api key"));
        let task = Task::new("Doomed", "x").with_agent("Worker");
        let mut crew = Crew::new("c", vec![agent("Worker", &llm)], vec![task]);
        let err = crew.kickoff(None).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Task 'Doomed' failed:"));
        assert!(message.contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_running() {
        let llm = Arc::new(ScriptedLLM::new(Vec::<String>::new()));
        let task = Task::new("About {idea}", "x").with_agent("Worker");
        let mut crew = Crew::new("c", vec![agent("Worker", &llm)], vec![task]);
        let inputs = HashMap::from([("other".to_string(), "y".to_string())]);
        assert!(matches!(
            crew.kickoff(Some(inputs)).await,
            Err(CrewError::Interpolation(_))
        ));
    }
}
