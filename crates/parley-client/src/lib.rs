//! Network collaborators of the dialogue router.
//!
//! Each external service sits behind an async trait so the router can be
//! driven by mocks in tests. The `Http*` types are the production
//! implementations built on a shared `reqwest::Client`.

pub mod error;
pub mod grammar;
pub mod history;
pub mod http;
pub mod identity;
pub mod nlu;

pub use error::ClientError;
pub use grammar::{apply_edits, GrammarEdit, GrammarService, HttpGrammarClient};
pub use history::{HistoryStore, HttpHistoryClient};
pub use identity::{HttpIdentityClient, IdentityService, OtpVerification, Registration};
pub use nlu::{merge_fragments, HttpNluClient, NluFragment, NluService};
