//! Mirroring of the local collections to a hosted store

pub mod layer;
pub mod remote;
pub mod worker;

pub use layer::{PullOutcome, PushOutcome, ReconcileAction, ReconcileReport, SyncLayer};
pub use remote::{HostedStore, MemoryHostedStore, RestHostedStore, UserDataRow};
pub use worker::{SyncHandle, SyncStats, SyncWorker};
