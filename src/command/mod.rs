//! Command pipeline
//!
//! Utterance -> IntentResolver -> Resolution (raw actions + reply)
//! -> ActionExecutor -> BatchResult, with pushes queued on the sync worker.

pub mod action;
pub mod executor;
pub mod heuristics;
pub mod resolver;

pub use action::{Action, ActionError, ActionResult, NewRecord, RecordPatch};
pub use executor::{ActionEffect, ActionExecutor, ActionOutcome, BatchResult};
pub use resolver::{Fallback, IntentResolver, Resolution};
