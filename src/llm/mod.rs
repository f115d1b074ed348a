//! LLM integration for the natural language assistant

pub mod client;
pub mod context;
pub mod parser;

pub use client::{CompletionService, LlmClient};
pub use context::AssistantContext;
pub use parser::{parse_reply, request_reply, AssistantReply, RawAction};
