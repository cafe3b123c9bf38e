pub mod config;
pub mod error;
pub mod types;

pub use config::ParleyConfig;
pub use error::{ErrorClass, ParleyError, Result};
pub use types::*;
