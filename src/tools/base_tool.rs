//! Base tool definitions.
//!
//! Provides the [`BaseTool`] trait every agent tool implements, the
//! [`ToolError`] type, and [`Tool`], a tool backed by a plain function.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::utilities::string_utils::sanitize_tool_name;

/// Errors raised while running a tool.
///
/// The agent executor reports these back to the model as observations, so
/// messages should read well as a sentence.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model passed arguments the tool cannot use.
    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    /// Fetching a remote resource failed.
    #[error("Request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The tool ran but found nothing useful.
    #[error("No results: {0}")]
    NoResults(String),

    /// Any other failure inside the tool.
    #[error("Tool execution failed: {0}")]
    Execution(String),
}

/// Trait for all tools agents can call.
///
/// Implementors provide `name`, `description` and `run`. Tool input is the
/// raw `Action Input:` text the model produced, usually a JSON object.
#[async_trait]
pub trait BaseTool: Send + Sync + fmt::Debug {
    /// The unique name of the tool that clearly communicates its purpose.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// JSON schema for the arguments that the tool accepts.
    fn args_schema(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// Run the tool.
    async fn run(&self, input: &str) -> Result<String, ToolError>;

    /// Name used to match the model's `Action:` line.
    fn sanitized_name(&self) -> String {
        sanitize_tool_name(self.name())
    }

    /// Tool block rendered into the agent's system prompt.
    fn describe(&self) -> String {
        format!(
            "Tool Name: {}\nTool Arguments: {}\nTool Description: {}",
            self.name(),
            self.args_schema(),
            self.description()
        )
    }
}

/// Type alias for a function backing a [`Tool`].
pub type ToolFn = Arc<dyn Fn(&str) -> Result<String, ToolError> + Send + Sync>;

/// Tool that wraps a synchronous function.
#[derive(Clone)]
pub struct Tool {
    tool_name: String,
    tool_description: String,
    tool_args_schema: Value,
    pub func: ToolFn,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.tool_name)
            .field("description", &self.tool_description)
            .finish()
    }
}

impl Tool {
    /// Create a new Tool wrapping the given function.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            tool_name: name.into(),
            tool_description: description.into(),
            tool_args_schema: Value::Object(serde_json::Map::new()),
            func: Arc::new(func),
        }
    }

    /// Builder method to set the args schema.
    pub fn with_args_schema(mut self, schema: Value) -> Self {
        self.tool_args_schema = schema;
        self
    }
}

#[async_trait]
impl BaseTool for Tool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.tool_description
    }

    fn args_schema(&self) -> Value {
        self.tool_args_schema.clone()
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        (self.func)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_function_tool_runs() {
        let tool = Tool::new("Echo Tool", "Repeats its input", |input: &str| {
            Ok(format!("echo: {}", input))
        });
        assert_eq!(tool.run("hello").await.unwrap(), "echo: hello");
        assert_eq!(tool.sanitized_name(), "echo_tool");
    }

    #[test]
    fn test_describe_includes_schema() {
        let tool = Tool::new("Echo", "Repeats", |_: &str| Ok(String::new())).with_args_schema(
            serde_json::json!({"text": {"type": "string"}}),
        );
        let described = tool.describe();
        assert!(described.starts_with("Tool Name: Echo\n"));
        assert!(described.contains(r#"{"text":{"type":"string"}}"#));
        assert!(described.ends_with("Tool Description: Repeats"));
    }

    #[test]
    fn test_tool_error_messages() {
        let err = ToolError::InvalidInput("missing website".to_string());
        assert_eq!(err.to_string(), "Invalid tool input: missing website");
    }
}
