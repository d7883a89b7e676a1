//! Startup idea generation and validation.
//!
//! [`StartupIdeas`] builds the generation and validation crews from the
//! embedded `config/agents.yaml` and `config/tasks.yaml`, runs them, and
//! turns their output into [`IdeaRecord`]s and [`ValidationReport`]s.

pub mod crews;
pub mod parser;

pub use crews::{build_idea_context, IdeaGenerationRequest, IdeasError, StartupIdeas};
pub use parser::{parse_ideas, IdeaRecord, ValidationReport};
