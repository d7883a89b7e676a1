//! Agent executor.
//!
//! Runs the ReAct loop for one task: prompt the model, parse its reply, run
//! the requested tool, feed the observation back, and repeat until the model
//! gives a final answer or the iteration cap is reached.

use std::fmt;
use std::sync::Arc;

use crate::llms::base_llm::{apply_stop_words, generate_call_id, BaseLLM, LLMError, LLMMessage};
use crate::tools::base_tool::BaseTool;
use crate::types::usage_metrics::UsageMetrics;
use crate::utilities::prompts::{
    tool_not_found, AgentInfo, Prompts, FORCE_FINAL_ANSWER, OBSERVATION_STOP,
};
use crate::utilities::string_utils::sanitize_tool_name;

use super::parser::{parse, AgentAction, ParseResult};

/// What one executor run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentExecution {
    /// The final answer text.
    pub output: String,
    /// Full conversation, system prompt first.
    pub messages: Vec<LLMMessage>,
    /// Usage summed over every model call.
    pub usage: UsageMetrics,
    /// Number of model calls made.
    pub iterations: u32,
}

/// Executor for crew agents.
pub struct CrewAgentExecutor {
    llm: Arc<dyn BaseLLM>,
    prompts: Prompts,
    /// Stop word list for the LLM.
    pub stop: Vec<String>,
    /// Maximum iterations before forcing a final answer.
    pub max_iter: u32,
    pub verbose: bool,
    messages: Vec<LLMMessage>,
    iterations: u32,
    usage: UsageMetrics,
}

impl fmt::Debug for CrewAgentExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrewAgentExecutor")
            .field("model", &self.llm.model())
            .field("tools", &self.prompts.tool_names())
            .field("max_iter", &self.max_iter)
            .field("iterations", &self.iterations)
            .field("messages_count", &self.messages.len())
            .finish()
    }
}

impl CrewAgentExecutor {
    pub fn new(llm: Arc<dyn BaseLLM>, tools: Vec<Arc<dyn BaseTool>>, max_iter: u32) -> Self {
        let mut stop: Vec<String> = llm.stop().to_vec();
        if !tools.is_empty() {
            stop.push(OBSERVATION_STOP.to_string());
        }
        Self {
            llm,
            prompts: Prompts::new(tools),
            stop,
            max_iter,
            verbose: false,
            messages: Vec::new(),
            iterations: 0,
            usage: UsageMetrics::default(),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check whether stop words are sent to the provider.
    pub fn use_stop_words(&self) -> bool {
        self.llm.supports_stop_words() && !self.stop.is_empty()
    }

    /// Run the loop for `task_prompt` and return the final answer.
    ///
    /// Only model failures are errors. Tool failures, unknown tools and
    /// unparseable replies are sent back to the model as observations.
    pub async fn invoke(
        mut self,
        agent: AgentInfo<'_>,
        task_prompt: &str,
    ) -> Result<AgentExecution, LLMError> {
        let prompt = self.prompts.task_execution(agent, task_prompt);
        self.messages = vec![LLMMessage::system(prompt.system), LLMMessage::user(prompt.user)];

        let output = self.invoke_loop(agent.role).await?;
        Ok(AgentExecution {
            output,
            messages: self.messages,
            usage: self.usage,
            iterations: self.iterations,
        })
    }

    async fn invoke_loop(&mut self, role: &str) -> Result<String, LLMError> {
        while self.iterations < self.max_iter {
            let answer = self.call_llm().await?;

            match parse(&answer) {
                Ok(ParseResult::Finish(finish)) => {
                    self.log_step(role, "final answer", &finish.thought);
                    self.messages.push(LLMMessage::assistant(answer));
                    return Ok(finish.output);
                }
                Ok(ParseResult::Action(action)) => {
                    self.log_step(role, &action.tool, &action.thought);
                    let observation = self.execute_tool(&action).await;
                    self.messages.push(LLMMessage::assistant(format!(
                        "{}\nObservation: {}",
                        answer, observation
                    )));
                }
                Err(_) if !self.prompts.has_tools() => {
                    // Tool-less agents often skip the format and just answer.
                    self.messages.push(LLMMessage::assistant(answer.clone()));
                    return Ok(answer.trim().to_string());
                }
                Err(err) => {
                    log::debug!("Agent '{}' reply did not parse: {}", role, err);
                    self.messages.push(LLMMessage::assistant(answer));
                    self.messages.push(LLMMessage::user(err.error));
                }
            }
        }

        log::warn!(
            "Agent '{}' reached max iterations ({}), forcing final answer",
            role,
            self.max_iter
        );
        self.handle_max_iterations_exceeded().await
    }

    async fn handle_max_iterations_exceeded(&mut self) -> Result<String, LLMError> {
        self.messages.push(LLMMessage::user(FORCE_FINAL_ANSWER));
        let answer = self.call_llm().await?;
        self.messages.push(LLMMessage::assistant(answer.clone()));

        match parse(&answer) {
            Ok(ParseResult::Finish(finish)) => Ok(finish.output),
            _ => Ok(answer.trim().to_string()),
        }
    }

    async fn call_llm(&mut self) -> Result<String, LLMError> {
        let call_id = generate_call_id();
        let stop: &[String] = if self.use_stop_words() { &self.stop } else { &[] };
        log::debug!(
            "LLM call {} (iteration {}, {} messages)",
            call_id,
            self.iterations + 1,
            self.messages.len()
        );

        let response = self.llm.acall(&self.messages, stop).await?;
        self.iterations += 1;
        if let Some(usage) = &response.usage {
            self.usage.add_usage_metrics(usage);
        }

        let content = apply_stop_words(&response.content, &self.stop);
        if content.trim().is_empty() {
            return Err(LLMError::InvalidResponse {
                provider: self.llm.provider().to_string(),
                reason: "Invalid response from LLM call - None or empty.".to_string(),
            });
        }
        Ok(content)
    }

    async fn execute_tool(&self, action: &AgentAction) -> String {
        let wanted = sanitize_tool_name(&action.tool);
        let Some(tool) = self
            .prompts
            .tools
            .iter()
            .find(|t| t.sanitized_name() == wanted)
        else {
            log::warn!("Model asked for unknown tool '{}'", action.tool);
            return tool_not_found(&action.tool, &self.prompts.tool_names());
        };

        match tool.run(&action.tool_input).await {
            Ok(result) => result,
            Err(err) => {
                log::warn!("Tool '{}' failed: {}", tool.name(), err);
                format!("{}. Fix the input or try a different approach.", err)
            }
        }
    }

    fn log_step(&self, role: &str, step: &str, thought: &str) {
        if self.verbose {
            log::info!("[{}] {} | {}", role, step, thought);
        } else {
            log::debug!("[{}] {} | {}", role, step, thought);
        }
    }
}
