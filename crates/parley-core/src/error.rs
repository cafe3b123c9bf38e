use std::fmt;

use thiserror::Error;

/// Top-level error type for Parley.
///
/// Subsystem crates define their own error types and implement
/// `From<ParleyError>` where they need to carry these across a crate
/// boundary with `?`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ParleyError {
    fn from(err: toml::de::Error) -> Self {
        ParleyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ParleyError {
    fn from(err: toml::ser::Error) -> Self {
        ParleyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ParleyError {
    fn from(err: serde_json::Error) -> Self {
        ParleyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;

/// How a failure is treated by the conversation flow.
///
/// - `Validation`: bad phone/OTP/name, shown inline, no state change.
/// - `Authentication`: expired or invalid token/OTP; either a retry of the
///   current step or a reset to the phone step.
/// - `Transport`: service unreachable, shown as a bot message, state kept.
/// - `BestEffort`: swallowed and logged, never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Validation,
    Authentication,
    Transport,
    BestEffort,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Validation => write!(f, "validation"),
            ErrorClass::Authentication => write!(f, "authentication"),
            ErrorClass::Transport => write!(f, "transport"),
            ErrorClass::BestEffort => write!(f, "best-effort"),
        }
    }
}
