//! Error types for the dialogue layer.

use parley_core::ParleyError;

/// Contract violations of the router API.
///
/// Failures of the external services are not errors at this level: they
/// become bot-originated transcript entries.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("an authentication step is already in progress")]
    AuthInFlight,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("session store error: {0}")]
    SessionStore(#[from] ParleyError),
}

pub type Result<T> = std::result::Result<T, ChatError>;
