//! Crew projects configured from YAML.
//!
//! A [`CrewBase`] holds agent and task definitions keyed by name, in the
//! `agents.yaml` / `tasks.yaml` layout:
//!
//! ```yaml
//! # agents.yaml
//! market_researcher:
//!   role: Market Research Analyst
//!   goal: Analyze market demand
//!   backstory: You are an expert in market research.
//!   tools:
//!     - kind: website_search
//!       description: Search the web for market data
//!
//! # tasks.yaml
//! market_analysis:
//!   description: "Conduct a market analysis for: {idea}"
//!   expected_output: A market analysis report.
//!   async_execution: true
//! ```
//!
//! Components are built on demand, so every crew gets fresh agents and tasks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::agent::Agent;
use crate::llms::base_llm::BaseLLM;
use crate::task::Task;
use crate::tools::base_tool::BaseTool;
use crate::tools::website_search_tool::WebsiteSearchTool;

/// Errors raised while loading or using project configuration.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Invalid {file}: {source}")]
    Yaml {
        file: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No agent named '{0}' in agents config")]
    UnknownAgent(String),

    #[error("No task named '{0}' in tasks config")]
    UnknownTask(String),
}

// ---------------------------------------------------------------------------
// Config entries
// ---------------------------------------------------------------------------

/// A tool attached to an agent in `agents.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolConfig {
    WebsiteSearch {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        website: Option<String>,
    },
}

impl ToolConfig {
    fn build(&self) -> Arc<dyn BaseTool> {
        match self {
            ToolConfig::WebsiteSearch {
                description,
                website,
            } => {
                let mut tool = WebsiteSearchTool::new();
                if let Some(description) = description {
                    tool = tool.with_description(description.trim());
                }
                if let Some(website) = website {
                    tool = tool.with_website(website.trim());
                }
                Arc::new(tool)
            }
        }
    }
}

/// One entry of `agents.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
    #[serde(default)]
    pub max_iter: Option<u32>,
    #[serde(default)]
    pub verbose: bool,
}

/// One entry of `tasks.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskConfig {
    pub description: String,
    pub expected_output: String,
    #[serde(default)]
    pub async_execution: bool,
}

// ---------------------------------------------------------------------------
// CrewBase
// ---------------------------------------------------------------------------

/// Agent and task definitions for a crew project.
#[derive(Debug, Clone, Default)]
pub struct CrewBase {
    pub agents_config: HashMap<String, AgentConfig>,
    pub tasks_config: HashMap<String, TaskConfig>,
    /// Overrides every agent's `max_iter` when set.
    pub max_iter: Option<u32>,
}

impl CrewBase {
    /// Parse agents and tasks YAML documents.
    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> Result<Self, ProjectError> {
        let agents_config = serde_yaml::from_str(agents_yaml).map_err(|source| ProjectError::Yaml {
            file: "agents config",
            source,
        })?;
        let tasks_config = serde_yaml::from_str(tasks_yaml).map_err(|source| ProjectError::Yaml {
            file: "tasks config",
            source,
        })?;
        Ok(Self {
            agents_config,
            tasks_config,
            max_iter: None,
        })
    }

    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    /// Build the agent named `key`, running on `llm`.
    pub fn agent(&self, key: &str, llm: Arc<dyn BaseLLM>) -> Result<Agent, ProjectError> {
        let config = self
            .agents_config
            .get(key)
            .ok_or_else(|| ProjectError::UnknownAgent(key.to_string()))?;

        let mut agent = Agent::new(
            config.role.trim(),
            config.goal.trim(),
            config.backstory.trim(),
        )
        .with_llm(llm)
        .with_verbose(config.verbose);

        if let Some(max_iter) = self.max_iter.or(config.max_iter) {
            agent = agent.with_max_iter(max_iter);
        }
        for tool in &config.tools {
            agent = agent.with_tool(tool.build());
        }
        Ok(agent)
    }

    /// Build the task named `key`, assigned to the agent with `agent_role`.
    pub fn task(&self, key: &str, agent_role: &str) -> Result<Task, ProjectError> {
        let config = self
            .tasks_config
            .get(key)
            .ok_or_else(|| ProjectError::UnknownTask(key.to_string()))?;

        Ok(Task::new(config.description.trim(), config.expected_output.trim())
            .with_name(key)
            .with_agent(agent_role)
            .with_async_execution(config.async_execution))
    }
}
