//! Conversation layer: the session state machine, transcript, suggestions
//! and the dialogue router that ties them to the network services.

pub mod error;
pub mod normalizer;
pub mod router;
pub mod session;
pub mod state;
pub mod suggest;
pub mod transcript;

pub use error::ChatError;
pub use normalizer::TextNormalizer;
pub use router::{DialogueRouter, Routed, RouterServices};
pub use session::SessionStore;
pub use state::AuthState;
pub use suggest::SuggestionEngine;
pub use transcript::Transcript;
