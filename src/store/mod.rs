//! Local persistence of the record collections

pub mod backend;
pub mod entity_store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use entity_store::{storage_key, EntityStore};
