//! LLM system.
//!
//! - [`base_llm`] - The [`BaseLLM`] trait, messages, responses and errors
//! - [`providers`] - Concrete provider clients (OpenAI)

pub mod base_llm;
pub mod providers;

// Re-exports for convenience
pub use base_llm::{BaseLLM, LLMError, LLMMessage, LLMResponse};
pub use providers::openai::OpenAICompletion;

#[cfg(test)]
pub(crate) mod testing;
