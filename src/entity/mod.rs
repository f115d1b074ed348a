//! Record types owned by the entity store
//!
//! Records never reference each other. Each belongs to exactly one
//! collection and is identified by its `RecordId` within it.

pub mod category;
pub mod event;
pub mod task;
pub mod time_format;
pub mod transaction;

pub use category::{Category, Priority, TransactionCategory, TransactionType};
pub use event::Event;
pub use task::Task;
pub use transaction::{balance, Transaction};

use crate::core::types::{EntityKind, RecordId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A record type stored as one whole collection
pub trait StoredRecord: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &RecordId;

    /// Short human-readable label
    fn label(&self) -> &str;

    fn into_record(self) -> Record;
}

impl StoredRecord for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn into_record(self) -> Record {
        Record::Task(self)
    }
}

impl StoredRecord for Event {
    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn into_record(self) -> Record {
        Record::Event(self)
    }
}

impl StoredRecord for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.description
    }

    fn into_record(self) -> Record {
        Record::Transaction(self)
    }
}

/// Any single record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Task(Task),
    Event(Event),
    Transaction(Transaction),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Task(_) => EntityKind::Task,
            Record::Event(_) => EntityKind::Event,
            Record::Transaction(_) => EntityKind::Transaction,
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            Record::Task(t) => &t.id,
            Record::Event(e) => &e.id,
            Record::Transaction(t) => &t.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Record::Task(t) => &t.title,
            Record::Event(e) => &e.title,
            Record::Transaction(t) => &t.description,
        }
    }
}

/// A whole collection read back for a `list` action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Collection {
    Tasks(Vec<Task>),
    Events(Vec<Event>),
    Transactions(Vec<Transaction>),
}

impl Collection {
    pub fn kind(&self) -> EntityKind {
        match self {
            Collection::Tasks(_) => EntityKind::Task,
            Collection::Events(_) => EntityKind::Event,
            Collection::Transactions(_) => EntityKind::Transaction,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Collection::Tasks(v) => v.len(),
            Collection::Events(v) => v.len(),
            Collection::Transactions(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only copy of all three collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub events: Vec<Event>,
    pub transactions: Vec<Transaction>,
}
