//! Error types shared by the utility layer.

use thiserror::Error;

/// Errors raised while loading [`Settings`](super::config::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors raised by placeholder interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    /// The template references a variable that was not supplied.
    #[error("Template variable '{0}' not found in inputs dictionary")]
    MissingVariable(String),
}
