//! The entity store - sole read/write surface for the three collections
//!
//! Every collection is loaded and persisted as one unit. Reads of absent
//! data produce an empty collection, never an error.

use crate::core::error::{OdrnaError, Result};
use crate::core::types::{EntityKind, RecordId};
use crate::entity::{Collection, Event, Snapshot, StoredRecord, Task, Transaction};
use crate::premium::Subscription;
use crate::store::backend::{FileBackend, MemoryBackend, StorageBackend};
use std::path::Path;

/// Storage key for a collection
pub fn storage_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Task => "odrna_tasks",
        EntityKind::Event => "odrna_events",
        EntityKind::Transaction => "odrna_transactions",
    }
}

const SUBSCRIPTION_KEY: &str = "odrna_subscription";

/// Local store for one client session
pub struct EntityStore {
    backend: Box<dyn StorageBackend>,
}

impl EntityStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Store persisted as JSON files under `dir`
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self::new(FileBackend::new(dir))
    }

    /// Load a collection, failing on unreadable or corrupt data
    pub fn try_get<R: StoredRecord>(&self) -> Result<Vec<R>> {
        let key = storage_key(R::KIND);
        match self.backend.read(key)? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                OdrnaError::Storage(format!("corrupt {} collection: {}", R::KIND.collection(), e))
            }),
        }
    }

    /// Load a collection, degrading to empty on failure
    pub fn get<R: StoredRecord>(&self) -> Vec<R> {
        self.try_get().unwrap_or_else(|e| {
            tracing::warn!("Reading {} failed: {}", R::KIND.collection(), e);
            Vec::new()
        })
    }

    /// Replace a whole collection
    pub fn save<R: StoredRecord>(&mut self, records: &[R]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.backend.write(storage_key(R::KIND), &raw)
    }

    /// Append one record and persist the collection
    pub fn add<R: StoredRecord>(&mut self, record: R) -> Result<R> {
        let mut records: Vec<R> = self.try_get()?;
        records.push(record.clone());
        self.save(&records)?;
        Ok(record)
    }

    /// Modify the record with `id` in place; `None` when it does not exist
    pub fn update<R: StoredRecord>(
        &mut self,
        id: &RecordId,
        apply: impl FnOnce(&mut R),
    ) -> Result<Option<R>> {
        let mut records: Vec<R> = self.try_get()?;
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        apply(record);
        let updated = record.clone();
        self.save(&records)?;
        Ok(Some(updated))
    }

    /// Remove the record with `id`; returns whether it existed
    pub fn delete<R: StoredRecord>(&mut self, id: &RecordId) -> Result<bool> {
        let mut records: Vec<R> = self.try_get()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records)?;
        Ok(true)
    }

    pub fn get_tasks(&self) -> Vec<Task> {
        self.get()
    }

    pub fn save_tasks(&mut self, tasks: &[Task]) -> Result<()> {
        self.save(tasks)
    }

    pub fn get_events(&self) -> Vec<Event> {
        self.get()
    }

    pub fn save_events(&mut self, events: &[Event]) -> Result<()> {
        self.save(events)
    }

    pub fn get_transactions(&self) -> Vec<Transaction> {
        self.get()
    }

    pub fn save_transactions(&mut self, transactions: &[Transaction]) -> Result<()> {
        self.save(transactions)
    }

    /// Live read of one collection
    pub fn collection(&self, kind: EntityKind) -> Collection {
        match kind {
            EntityKind::Task => Collection::Tasks(self.get()),
            EntityKind::Event => Collection::Events(self.get()),
            EntityKind::Transaction => Collection::Transactions(self.get()),
        }
    }

    /// Number of records in a collection
    pub fn count(&self, kind: EntityKind) -> usize {
        self.collection(kind).len()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.get(),
            events: self.get(),
            transactions: self.get(),
        }
    }

    /// Replace all three collections
    pub fn replace_all(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.save(&snapshot.tasks)?;
        self.save(&snapshot.events)?;
        self.save(&snapshot.transactions)
    }

    /// Last known subscription status, free plan when none was stored
    pub fn get_subscription(&self) -> Subscription {
        match self.backend.read(SUBSCRIPTION_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Corrupt subscription status: {}", e);
                Subscription::default()
            }),
            Ok(None) => Subscription::default(),
            Err(e) => {
                tracing::warn!("Reading subscription failed: {}", e);
                Subscription::default()
            }
        }
    }

    /// Cache a subscription status obtained from a trusted source
    pub fn save_subscription(&mut self, subscription: &Subscription) -> Result<()> {
        let raw = serde_json::to_string(subscription)?;
        self.backend.write(SUBSCRIPTION_KEY, &raw)
    }
}
