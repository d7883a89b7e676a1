//! Agent output parsing for ReAct-style LLM responses.
//!
//! Converts model replies that follow the ReAct (Reasoning and Acting)
//! format into an [`AgentAction`] or an [`AgentFinish`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The text prefix for a final answer.
pub const FINAL_ANSWER_ACTION: &str = "Final Answer:";

const MISSING_ACTION_AFTER_THOUGHT_ERROR_MESSAGE: &str =
    "I just got this: I couldn't find an Action after the Thought.";

const MISSING_ACTION_INPUT_AFTER_ACTION_ERROR_MESSAGE: &str =
    "I just got this: I found an Action but couldn't find a valid Action Input right after it.";

static ACTION_INPUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.+?)\s*(?:\n|\r\n?)Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)")
        .unwrap()
});
static ACTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Action\s*\d*\s*:").unwrap());
static ACTION_INPUT_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Action\s*\d*\s*Input\s*\d*\s*:").unwrap());

// ---------------------------------------------------------------------------
// Parsed results
// ---------------------------------------------------------------------------

/// An action the agent wants to take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    /// The agent's reasoning before the action.
    pub thought: String,
    /// The name of the tool to use.
    pub tool: String,
    /// The input to pass to the tool.
    pub tool_input: String,
    /// The raw text that was parsed.
    pub text: String,
    /// The result of executing the tool (populated after execution).
    pub result: Option<String>,
}

/// The final answer from an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFinish {
    pub thought: String,
    pub output: String,
    pub text: String,
}

/// Result of parsing agent output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// The agent wants to take an action (use a tool).
    Action(AgentAction),
    /// The agent has a final answer.
    Finish(AgentFinish),
}

/// Raised when a reply follows neither format.
///
/// The message is written for the model: the executor sends it back as the
/// next observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct OutputParserError {
    pub error: String,
}

impl OutputParserError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse function
// ---------------------------------------------------------------------------

/// Parse agent output text into `AgentAction` or `AgentFinish`.
///
/// **Action format** (results in `AgentAction`):
/// ```text
/// Thought: agent thought here
/// Action: search
/// Action Input: {"search_query": "pricing", "website": "https://example.com"}
/// ```
///
/// **Final answer format** (results in `AgentFinish`):
/// ```text
/// Thought: agent thought here
/// Final Answer: The market is worth $2B
/// ```
///
/// A final answer wins when both are present.
pub fn parse(text: &str) -> Result<ParseResult, OutputParserError> {
    let thought = extract_thought(text);

    if let Some((_, answer)) = text.rsplit_once(FINAL_ANSWER_ACTION) {
        let output = clean_trailing_backticks(answer.trim());
        return Ok(ParseResult::Finish(AgentFinish {
            thought,
            output,
            text: text.to_string(),
        }));
    }

    if let Some(caps) = ACTION_INPUT_RE.captures(text) {
        let action = caps.get(1).map_or("", |m| m.as_str());
        let action_input = caps.get(2).map_or("", |m| m.as_str()).trim();
        let tool_input = strip_code_fence(action_input);
        let tool_input = tool_input.trim_matches('"');

        return Ok(ParseResult::Action(AgentAction {
            thought,
            tool: clean_action(action),
            tool_input: safe_repair_json(tool_input),
            text: text.to_string(),
            result: None,
        }));
    }

    if !ACTION_RE.is_match(text) {
        return Err(OutputParserError::new(format!(
            "{}\nYou MUST use the following format:\n\
             Thought: [your thought]\n\
             Final Answer: [your final answer]",
            MISSING_ACTION_AFTER_THOUGHT_ERROR_MESSAGE
        )));
    }

    if !ACTION_INPUT_ONLY_RE.is_match(text) {
        return Err(OutputParserError::new(
            MISSING_ACTION_INPUT_AFTER_ACTION_ERROR_MESSAGE,
        ));
    }

    Err(OutputParserError::new(
        "Could not parse the output. Please use the correct format.",
    ))
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn extract_thought(text: &str) -> String {
    let thought_index = text.find("\nAction").or_else(|| text.find("\nFinal Answer"));
    match thought_index {
        Some(idx) => text[..idx].replace("```", "").trim().to_string(),
        None => String::new(),
    }
}

/// Remove markdown emphasis around the tool name.
fn clean_action(text: &str) -> String {
    text.trim().trim_matches('*').trim().to_string()
}

/// Drop an unmatched trailing code fence.
fn clean_trailing_backticks(text: &str) -> String {
    if text.ends_with("```") && text.matches("```").count() % 2 != 0 {
        return text[..text.len() - 3].trim_end().to_string();
    }
    text.to_string()
}

/// Unwrap an action input the model put inside a code fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim_end().trim_end_matches("```").trim()
}

/// Repair common model mistakes in JSON tool input.
///
/// Array inputs are left alone. Triple quotes become single quotes when that
/// yields valid JSON; otherwise the original text is returned.
fn safe_repair_json(tool_input: &str) -> String {
    if tool_input.starts_with('[') && tool_input.ends_with(']') {
        return tool_input.to_string();
    }

    let cleaned = tool_input.replace("\"\"\"", "\"");
    if serde_json::from_str::<Value>(&cleaned).is_ok() {
        return cleaned;
    }
    tool_input.to_string()
}
