//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a stored record
///
/// Stored as a plain string so records created elsewhere (timestamps,
/// numeric ids) load unchanged. Fresh ids are random v4 UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Authenticated user identity, resolved outside this crate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Event,
    Transaction,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Task, EntityKind::Event, EntityKind::Transaction];

    /// Wire tag used in the action `type` field
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Event => "event",
            EntityKind::Transaction => "transaction",
        }
    }

    /// Name of the collection, also the hosted column name
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Task => "tasks",
            EntityKind::Event => "events",
            EntityKind::Transaction => "transactions",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" => Ok(EntityKind::Task),
            "event" => Ok(EntityKind::Event),
            "transaction" => Ok(EntityKind::Transaction),
            other => Err(format!("unknown entity type '{}'", other)),
        }
    }
}

/// Action verb of the wire `action` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Update,
    Delete,
    List,
}

impl Verb {
    pub fn tag(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
            Verb::List => "list",
        }
    }

    /// Whether the verb changes a collection
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Verb::List)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Verb::Create),
            "update" => Ok(Verb::Update),
            "delete" => Ok(Verb::Delete),
            "list" => Ok(Verb::List),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}
