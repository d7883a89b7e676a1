//! The idea generation and idea validation crews.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crew::{Crew, CrewError};
use crate::llms::base_llm::BaseLLM;
use crate::project::{CrewBase, ProjectError};

use super::parser::{parse_ideas, IdeaRecord, ValidationReport};

const AGENTS_YAML: &str = include_str!("config/agents.yaml");
const TASKS_YAML: &str = include_str!("config/tasks.yaml");

/// Errors raised while building or running the idea crews.
#[derive(Debug, Error)]
pub enum IdeasError {
    #[error("Idea is required")]
    EmptyIdea,

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Crew(#[from] CrewError),
}

/// Optional guidance for idea generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaGenerationRequest {
    #[serde(default)]
    pub constraints: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub technology_focus: Option<String>,
}

/// Guidance lines for the generation task; blank values are skipped.
pub fn build_idea_context(
    constraints: Option<&str>,
    industry: Option<&str>,
    technology_focus: Option<&str>,
) -> String {
    let mut context = String::new();
    let lines = [
        ("Consider these constraints", constraints),
        ("Focus on this industry", industry),
        ("Leverage this technology", technology_focus),
    ];
    for (label, value) in lines {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            context.push_str(&format!("{}: {}\n", label, value));
        }
    }
    context
}

/// Builds and runs the startup idea crews from the embedded YAML project.
#[derive(Debug, Clone)]
pub struct StartupIdeas {
    project: CrewBase,
}

impl StartupIdeas {
    /// Load the embedded agent and task definitions.
    pub fn load() -> Result<Self, IdeasError> {
        Ok(Self {
            project: CrewBase::from_yaml(AGENTS_YAML, TASKS_YAML)?,
        })
    }

    /// Cap ReAct iterations for every agent.
    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.project = self.project.with_max_iter(max_iter);
        self
    }

    /// One agent, one task: the MVP idea specialist generates ideas.
    ///
    /// Returns the crew and the inputs to kick it off with.
    pub fn create_idea_generation_crew(
        &self,
        llm: Arc<dyn BaseLLM>,
        request: &IdeaGenerationRequest,
    ) -> Result<(Crew, HashMap<String, String>), IdeasError> {
        let specialist = self.project.agent("mvp_idea_specialist", llm)?;
        let task = self.project.task("idea_generation", &specialist.role)?;

        let context = build_idea_context(
            request.constraints.as_deref(),
            request.industry.as_deref(),
            request.technology_focus.as_deref(),
        );
        let inputs = HashMap::from([("context".to_string(), context)]);

        Ok((Crew::new("idea_generation", vec![specialist], vec![task]), inputs))
    }

    /// Market analysis and technical evaluation run concurrently; the
    /// business plan follows with both reports as context.
    pub fn create_idea_validation_crew(
        &self,
        llm: Arc<dyn BaseLLM>,
        idea: &str,
    ) -> Result<(Crew, HashMap<String, String>), IdeasError> {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(IdeasError::EmptyIdea);
        }

        let researcher = self.project.agent("market_researcher", llm.clone())?;
        let evaluator = self.project.agent("technical_evaluator", llm.clone())?;
        let strategist = self.project.agent("business_strategist", llm)?;

        let market = self.project.task("market_analysis", &researcher.role)?;
        let technical = self.project.task("technical_evaluation", &evaluator.role)?;
        let business = self
            .project
            .task("business_plan", &strategist.role)?
            .with_context(vec![market.id, technical.id]);

        let inputs = HashMap::from([("idea".to_string(), idea.to_string())]);
        let crew = Crew::new(
            "idea_validation",
            vec![researcher, evaluator, strategist],
            vec![market, technical, business],
        );
        Ok((crew, inputs))
    }

    /// Run the generation crew and parse its output into idea records.
    pub async fn generate_ideas(
        &self,
        llm: Arc<dyn BaseLLM>,
        request: &IdeaGenerationRequest,
    ) -> Result<Vec<IdeaRecord>, IdeasError> {
        let (mut crew, inputs) = self.create_idea_generation_crew(llm, request)?;
        let output = crew.kickoff(Some(inputs)).await?;

        let ideas = parse_ideas(&output.raw);
        tracing::debug!(ideas = ideas.len(), "Parsed generated ideas");
        Ok(ideas)
    }

    /// Run the validation crew and collect its three reports.
    pub async fn validate_idea(
        &self,
        llm: Arc<dyn BaseLLM>,
        idea: &str,
    ) -> Result<ValidationReport, IdeasError> {
        let (mut crew, inputs) = self.create_idea_validation_crew(llm, idea)?;
        let output = crew.kickoff(Some(inputs)).await?;

        if output.tasks_output.len() >= 3 {
            let raws: Vec<&str> = output.tasks_output.iter().map(|t| t.raw.as_str()).collect();
            Ok(ValidationReport::from_task_outputs(&raws))
        } else {
            tracing::warn!(
                tasks = output.tasks_output.len(),
                "Validation crew returned fewer reports than expected, splitting final output"
            );
            Ok(ValidationReport::from_sections(&output.raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::testing::ScriptedLLM;

    fn ideas() -> StartupIdeas {
        StartupIdeas::load().unwrap()
    }

    #[test]
    fn test_build_idea_context() {
        assert_eq!(build_idea_context(None, None, None), "");
        assert_eq!(
            build_idea_context(Some("no hardware"), Some("  "), Some("AI")),
            "Consider these constraints: no hardware\nLeverage this technology: AI\n"
        );
    }

    #[test]
    fn test_embedded_config_loads() {
        let llm: Arc<dyn BaseLLM> = Arc::new(ScriptedLLM::new(Vec::<String>::new()));
        let project = ideas().project;
        for key in [
            "mvp_idea_specialist",
            "market_researcher",
            "technical_evaluator",
            "business_strategist",
        ] {
            project.agent(key, llm.clone()).unwrap();
        }
        let specialist = project.agent("mvp_idea_specialist", llm.clone()).unwrap();
        assert_eq!(specialist.role, "Minimal Viable Product Idea Specialist");
        assert_eq!(specialist.tools.len(), 1);
        assert!(specialist.backstory.contains("\"market hole analysis\""));
        assert!(project.agent("technical_evaluator", llm).unwrap().tools.is_empty());
    }

    #[test]
    fn test_generation_crew_shape() {
        let llm: Arc<dyn BaseLLM> = Arc::new(ScriptedLLM::new(Vec::<String>::new()));
        let request = IdeaGenerationRequest {
            industry: Some("Healthcare".to_string()),
            ..Default::default()
        };
        let (crew, inputs) = ideas().create_idea_generation_crew(llm, &request).unwrap();
        assert_eq!(crew.agents.len(), 1);
        assert_eq!(crew.tasks.len(), 1);
        assert_eq!(inputs["context"], "Focus on this industry: Healthcare\n");
    }

    #[test]
    fn test_validation_crew_shape() {
        let llm: Arc<dyn BaseLLM> = Arc::new(ScriptedLLM::new(Vec::<String>::new()));
        let (crew, inputs) = ideas()
            .create_idea_validation_crew(llm, " CRM for plumbers ")
            .unwrap();
        assert_eq!(inputs["idea"], "CRM for plumbers");
        assert!(crew.tasks[0].async_execution);
        assert!(crew.tasks[1].async_execution);
        assert!(!crew.tasks[2].async_execution);
        assert_eq!(
            crew.tasks[2].context,
            Some(vec![crew.tasks[0].id, crew.tasks[1].id])
        );
    }

    #[test]
    fn test_blank_idea_is_rejected() {
        let llm: Arc<dyn BaseLLM> = Arc::new(ScriptedLLM::new(Vec::<String>::new()));
        assert!(matches!(
            ideas().create_idea_validation_crew(llm, "   "),
            Err(IdeasError::EmptyIdea)
        ));
    }

    #[tokio::test]
    async fn test_generate_ideas_end_to_end() {
        let llm = Arc::new(ScriptedLLM::new([
            "Thought: I now can give a great answer\nFinal Answer: Name: TaskFlow\nTagline: Tasks made simple\n\nName: PetPal\nTagline: Pet care",
        ]));
        let request = IdeaGenerationRequest {
            constraints: Some("bootstrapped".to_string()),
            ..Default::default()
        };
        let records = ideas().generate_ideas(llm.clone(), &request).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("tagline"), Some("Pet care"));
        let calls = llm.calls();
        let prompt = &calls[0][1].content;
        assert!(prompt.contains("Generate 3-5 innovative startup ideas"));
        assert!(prompt.contains("Consider these constraints: bootstrapped"));
        assert!(!prompt.contains("{context}"));
    }

    #[tokio::test]
    async fn test_validate_idea_end_to_end() {
        let llm = Arc::new(
            ScriptedLLM::new(Vec::<String>::new())
                .with_rule("Conduct a thorough market analysis", "Final Answer: Market is $2B")
                .with_rule("Evaluate the technical feasibility", "Final Answer: Medium complexity")
                .with_rule("Develop a business plan outline", "Final Answer: Subscription at $29/mo"),
        );
        let report = ideas()
            .validate_idea(llm.clone(), "CRM for plumbers")
            .await
            .unwrap();

        assert_eq!(report.market_analysis, "Market is $2B");
        assert_eq!(report.technical_evaluation, "Medium complexity");
        assert_eq!(report.business_plan, "Subscription at $29/mo");

        let plan_prompt = llm
            .calls()
            .into_iter()
            .map(|call| call[1].content.clone())
            .find(|content| content.contains("Develop a business plan outline"))
            .unwrap();
        assert!(plan_prompt.contains("startup idea: CRM for plumbers"));
        assert!(plan_prompt.contains("Context:\nMarket is $2B\n\n---\n\nMedium complexity"));
    }
}
