//! ReAct output parsing and the agent executor loop.

pub mod crew_agent_executor;
pub mod parser;

pub use crew_agent_executor::{AgentExecution, CrewAgentExecutor};
pub use parser::{AgentAction, AgentFinish, OutputParserError, ParseResult};
