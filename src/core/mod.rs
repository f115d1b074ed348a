pub mod config;
pub mod error;
pub mod types;

pub use error::{OdrnaError, Result};
pub use types::{EntityKind, RecordId, UserId, Verb};
