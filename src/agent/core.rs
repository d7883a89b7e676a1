//! Core Agent struct.
//!
//! An agent is a role with a goal and a backstory, a language model, and the
//! tools it may call. Crews hand it task prompts through
//! [`Agent::execute_task`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::agents::crew_agent_executor::{AgentExecution, CrewAgentExecutor};
use crate::llms::base_llm::{BaseLLM, LLMError};
use crate::tools::base_tool::BaseTool;
use crate::utilities::errors::InterpolationError;
use crate::utilities::prompts::AgentInfo;
use crate::utilities::string_utils::interpolate_only;

/// Iteration cap used when none is configured.
pub const DEFAULT_MAX_ITER: u32 = 15;

/// Errors raised while an agent works on a task.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent '{0}' has no language model configured")]
    NoLlm(String),

    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

/// Represents an agent in a crew.
#[derive(Clone, Serialize)]
pub struct Agent {
    /// Unique identifier for the agent.
    pub id: Uuid,
    /// Role of the agent. Tasks refer to their agent by role.
    pub role: String,
    /// Objective of the agent.
    pub goal: String,
    /// Backstory of the agent.
    pub backstory: String,
    /// Tools at the agent's disposal.
    #[serde(skip)]
    pub tools: Vec<Arc<dyn BaseTool>>,
    /// Language model that will run the agent.
    #[serde(skip)]
    pub llm: Option<Arc<dyn BaseLLM>>,
    /// Maximum iterations for an agent to execute a task.
    pub max_iter: u32,
    /// Verbose mode for the agent execution.
    pub verbose: bool,

    #[serde(skip)]
    original_role: Option<String>,
    #[serde(skip)]
    original_goal: Option<String>,
    #[serde(skip)]
    original_backstory: Option<String>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("llm", &self.llm.as_ref().map(|llm| llm.model()))
            .field("max_iter", &self.max_iter)
            .finish()
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Agent(role={}, goal={}, backstory={})",
            self.role, self.goal, self.backstory
        )
    }
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            llm: None,
            max_iter: DEFAULT_MAX_ITER,
            verbose: false,
            original_role: None,
            original_goal: None,
            original_backstory: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn BaseLLM>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn BaseTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Execute a task prompt, with `context` from earlier tasks appended.
    pub async fn execute_task(
        &self,
        task_prompt: &str,
        context: Option<&str>,
    ) -> Result<AgentExecution, AgentError> {
        let llm = self
            .llm
            .clone()
            .ok_or_else(|| AgentError::NoLlm(self.role.clone()))?;

        let task_prompt = match context {
            Some(ctx) if !ctx.trim().is_empty() => format!("{}\n\nContext:\n{}", task_prompt, ctx),
            _ => task_prompt.to_string(),
        };

        log::debug!("Agent '{}' executing task ({} chars)", self.role, task_prompt.len());

        let executor = CrewAgentExecutor::new(llm, self.tools.clone(), self.max_iter)
            .with_verbose(self.verbose);
        let info = AgentInfo {
            role: &self.role,
            goal: &self.goal,
            backstory: &self.backstory,
        };
        let execution = executor.invoke(info, &task_prompt).await?;

        log::debug!(
            "Agent '{}' finished after {} model calls",
            self.role,
            execution.iterations
        );
        Ok(execution)
    }

    /// Interpolate inputs into the agent role, goal, and backstory.
    ///
    /// The uninterpolated text is kept, so calling this again with new
    /// inputs starts from the original templates.
    pub fn interpolate_inputs(
        &mut self,
        inputs: &HashMap<String, String>,
    ) -> Result<(), InterpolationError> {
        let role = self.original_role.get_or_insert_with(|| self.role.clone());
        let goal = self.original_goal.get_or_insert_with(|| self.goal.clone());
        let backstory = self
            .original_backstory
            .get_or_insert_with(|| self.backstory.clone());

        if inputs.is_empty() {
            return Ok(());
        }

        let role = interpolate_only(role, inputs)?;
        let goal = interpolate_only(goal, inputs)?;
        let backstory = interpolate_only(backstory, inputs)?;
        self.role = role;
        self.goal = goal;
        self.backstory = backstory;
        Ok(())
    }
}
