//! Error types for the service clients.

use parley_core::ErrorClass;

/// Errors from the external services.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The service understood the request and refused it.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Where this failure sits in the error taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Rejected { .. } => ErrorClass::Validation,
            ClientError::Unauthorized => ErrorClass::Authentication,
            ClientError::Transport(_) | ClientError::Decode(_) => ErrorClass::Transport,
        }
    }

    /// Short phrase suitable for a bot-originated error message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected { message, .. } => message.clone(),
            ClientError::Unauthorized => "your session has expired".to_string(),
            ClientError::Transport(_) => "the service is unavailable".to_string(),
            ClientError::Decode(_) => "the service sent an unexpected response".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
