//! Utility modules: configuration, errors, prompts and string helpers.

pub mod config;
pub mod errors;
pub mod prompts;
pub mod string_utils;

pub use config::Settings;
pub use errors::{ConfigError, InterpolationError};
pub use prompts::Prompts;
