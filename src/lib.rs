//! Odrna - personal productivity core with a natural language assistant

pub mod backup;
pub mod command;
pub mod core;
pub mod entity;
pub mod insights;
pub mod llm;
pub mod premium;
pub mod session;
pub mod store;
pub mod sync;
