//! The `Agent` type and its errors.

pub mod core;

pub use self::core::{Agent, AgentError, DEFAULT_MAX_ITER};
