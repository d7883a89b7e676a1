//! # Startup Ideas
//!
//! An HTTP service that generates and validates startup ideas with crews of
//! LLM agents.
//!
//! Agents reason in a ReAct loop (`Thought` / `Action` / `Observation` /
//! `Final Answer`) against an OpenAI-compatible chat model. Tasks are
//! grouped into crews; a crew runs its tasks in order, lets async tasks run
//! concurrently, and feeds earlier outputs to later tasks as context.

pub mod agent;
pub mod agents;
pub mod crew;
pub mod crews;
pub mod ideas;
pub mod llm;
pub mod llms;
pub mod project;
pub mod server;
pub mod task;
pub mod tasks;
pub mod tools;
pub mod types;
pub mod utilities;

pub use agent::Agent;
pub use crew::Crew;
pub use crews::crew_output::CrewOutput;
pub use ideas::{IdeaRecord, StartupIdeas, ValidationReport};
pub use llm::LLM;
pub use llms::base_llm::BaseLLM;
pub use task::Task;
pub use tasks::task_output::TaskOutput;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
