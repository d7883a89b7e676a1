//! Prompt generation for agents.
//!
//! A prompt is assembled from fixed slices: who the agent is, which tools it
//! has (or the plain answer format when it has none), and the current task.

use std::sync::Arc;

use crate::tools::base_tool::BaseTool;

// ---------------------------------------------------------------------------
// Slices
// ---------------------------------------------------------------------------

const ROLE_PLAYING: &str = "You are {role}. {backstory}\nYour personal goal is: {goal}";

const TOOLS: &str = "\nYou ONLY have access to the following tools, and should NEVER make up tools that are not listed here:\n\n{tools}\n\nIMPORTANT: Use the following format in your response:\n\n```\nThought: you should always think about what to do\nAction: the action to take, only one name of [{tool_names}], just the name, exactly as it's written.\nAction Input: the input to the action, just a simple JSON object, enclosed in curly braces, using \" to wrap keys and values.\nObservation: the result of the action\n```\n\nOnce all necessary information is gathered, return the following format:\n\n```\nThought: I now know the final answer\nFinal Answer: the final answer to the original input question\n```";

const NO_TOOLS: &str = "\nTo give my best complete final answer to the task respond using the exact following format:\n\nThought: I now can give a great answer\nFinal Answer: Your final answer must be the great and the most complete as possible, it must be outcome described.\n\nI MUST use these formats, my job depends on it!";

const TASK: &str = "\nCurrent Task: {input}\n\nBegin! This is VERY important to you, use the tools available and give your best Final Answer, your job depends on it!\n\nThought:";

const TASK_NO_TOOLS: &str =
    "\nCurrent Task: {input}\n\nBegin! This is VERY important to you, your job depends on it!\n\nThought:";

/// Appended to the conversation when the iteration cap is reached.
pub const FORCE_FINAL_ANSWER: &str = "Now it's time you MUST give your absolute best final answer. You'll ignore all previous instructions, stop using any tools, and just return your absolute BEST Final answer.";

/// Stop sequence that ends a reply before the model invents a tool result.
pub const OBSERVATION_STOP: &str = "\nObservation:";

/// Rendered system and user prompts for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPromptResult {
    pub system: String,
    pub user: String,
}

/// Agent identity used for interpolation.
#[derive(Debug, Clone, Copy)]
pub struct AgentInfo<'a> {
    pub role: &'a str,
    pub goal: &'a str,
    pub backstory: &'a str,
}

/// Builds prompts for an agent with or without tools.
#[derive(Debug, Clone, Default)]
pub struct Prompts {
    pub tools: Vec<Arc<dyn BaseTool>>,
}

impl Prompts {
    pub fn new(tools: Vec<Arc<dyn BaseTool>>) -> Self {
        Self { tools }
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Comma-separated tool names as the model must write them.
    pub fn tool_names(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Tool blocks for the system prompt.
    pub fn tool_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.describe())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Generate the system and user prompt for a task.
    pub fn task_execution(&self, agent: AgentInfo<'_>, task_prompt: &str) -> SystemPromptResult {
        let mut system = ROLE_PLAYING
            .replace("{role}", agent.role)
            .replace("{goal}", agent.goal)
            .replace("{backstory}", agent.backstory);

        let task_slice = if self.has_tools() {
            system.push_str(
                &TOOLS
                    .replace("{tools}", &self.tool_descriptions())
                    .replace("{tool_names}", &self.tool_names()),
            );
            TASK
        } else {
            system.push_str(NO_TOOLS);
            TASK_NO_TOOLS
        };

        SystemPromptResult {
            system,
            user: task_slice.replace("{input}", task_prompt).trim_start().to_string(),
        }
    }
}

/// Observation sent back when the model names a tool it does not have.
pub fn tool_not_found(tool: &str, tool_names: &str) -> String {
    format!(
        "Action '{}' don't exist, these are the only available Actions: [{}]",
        tool, tool_names
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::base_tool::Tool;

    fn info() -> AgentInfo<'static> {
        AgentInfo {
            role: "Market Research Analyst",
            goal: "Analyze demand",
            backstory: "You know markets.",
        }
    }

    #[test]
    fn test_no_tools_prompt() {
        let prompts = Prompts::default();
        let result = prompts.task_execution(info(), "Size the market");
        assert!(result
            .system
            .starts_with("You are Market Research Analyst. You know markets.\nYour personal goal is: Analyze demand"));
        assert!(result.system.contains("Final Answer:"));
        assert!(!result.system.contains("Action Input"));
        assert!(result.user.starts_with("Current Task: Size the market"));
        assert!(result.user.ends_with("Thought:"));
    }

    #[test]
    fn test_tools_prompt_lists_tools() {
        let tool = Tool::new("Echo", "Repeats input", |s: &str| Ok(s.to_string()));
        let prompts = Prompts::new(vec![Arc::new(tool)]);
        let result = prompts.task_execution(info(), "Search");
        assert!(result.system.contains("Tool Name: Echo"));
        assert!(result.system.contains("only one name of [Echo]"));
        assert!(result.user.contains("use the tools available"));
    }

    #[test]
    fn test_tool_not_found() {
        assert_eq!(
            tool_not_found("google", "Echo, Search"),
            "Action 'google' don't exist, these are the only available Actions: [Echo, Search]"
        );
    }
}
