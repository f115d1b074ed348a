//! Push/pull between the local entity store and the hosted store
//!
//! Whole collections move as one unit and the later push wins. Nothing in
//! here returns an error to the caller: every failure is logged and reported
//! as an outcome value.

use crate::core::error::OdrnaError;
use crate::core::types::{EntityKind, UserId};
use crate::entity::{Event, StoredRecord, Task, Transaction};
use crate::premium::Subscription;
use crate::store::EntityStore;
use crate::sync::remote::{HostedStore, UserDataRow};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Pushed,
    Failed(String),
}

impl PushOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, PushOutcome::Pushed)
    }
}

/// Result of reading one hosted collection
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome<R> {
    /// No row, or the column was never written
    Missing,
    /// The column holds these records; may be empty when an empty
    /// collection was pushed
    Synced(Vec<R>),
    Failed(String),
}

/// What reconciliation did to one local collection
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileAction {
    /// Nothing hosted yet, local data untouched
    KeptLocal,
    /// Local collection replaced by the hosted copy
    ReplacedLocal { count: usize },
    /// Hosted copy was an empty list while local had records
    KeptLocalOverEmptyRemote { local: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    pub tasks: ReconcileAction,
    pub events: ReconcileAction,
    pub transactions: ReconcileAction,
}

impl ReconcileReport {
    fn all(action: ReconcileAction) -> Self {
        Self {
            tasks: action.clone(),
            events: action.clone(),
            transactions: action,
        }
    }

    pub fn get(&self, kind: EntityKind) -> &ReconcileAction {
        match kind {
            EntityKind::Task => &self.tasks,
            EntityKind::Event => &self.events,
            EntityKind::Transaction => &self.transactions,
        }
    }
}

/// Sync entry points bound to one hosted store
#[derive(Clone)]
pub struct SyncLayer {
    remote: Arc<dyn HostedStore>,
    timeout: Duration,
}

impl SyncLayer {
    pub fn new(remote: Arc<dyn HostedStore>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub fn remote(&self) -> &Arc<dyn HostedStore> {
        &self.remote
    }

    async fn bounded<T>(&self, fut: impl Future<Output = crate::core::Result<T>>) -> crate::core::Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(OdrnaError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Upsert one serialized collection under the user's row
    pub async fn push(&self, user: &UserId, kind: EntityKind, records: Value) -> PushOutcome {
        let result = self
            .bounded(self.remote.upsert_collection(user.as_str(), kind, records))
            .await;
        match result {
            Ok(()) => {
                tracing::debug!("Pushed {} for {}", kind.collection(), user);
                PushOutcome::Pushed
            }
            Err(e) => {
                tracing::warn!("Push of {} for {} failed: {}", kind.collection(), user, e);
                PushOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn push_records<R: StoredRecord>(&self, user: &UserId, records: &[R]) -> PushOutcome {
        match serde_json::to_value(records) {
            Ok(value) => self.push(user, R::KIND, value).await,
            Err(e) => {
                tracing::warn!("Serializing {} failed: {}", R::KIND.collection(), e);
                PushOutcome::Failed(e.to_string())
            }
        }
    }

    /// Push one local collection; an unreadable collection is never pushed
    pub async fn push_stored<R: StoredRecord>(&self, user: &UserId, store: &EntityStore) -> PushOutcome {
        match store.try_get::<R>() {
            Ok(records) => self.push_records(user, &records).await,
            Err(e) => {
                tracing::warn!("Not pushing {} for {}: {}", R::KIND.collection(), user, e);
                PushOutcome::Failed(e.to_string())
            }
        }
    }

    /// Push all three local collections
    pub async fn push_all(&self, user: &UserId, store: &EntityStore) -> Vec<(EntityKind, PushOutcome)> {
        vec![
            (EntityKind::Task, self.push_stored::<Task>(user, store).await),
            (EntityKind::Event, self.push_stored::<Event>(user, store).await),
            (
                EntityKind::Transaction,
                self.push_stored::<Transaction>(user, store).await,
            ),
        ]
    }

    async fn fetch_row(&self, user: &UserId) -> Result<Option<UserDataRow>, String> {
        self.bounded(self.remote.fetch_row(user.as_str()))
            .await
            .map_err(|e| {
                tracing::warn!("Pull for {} failed: {}", user, e);
                e.to_string()
            })
    }

    /// Read one hosted collection
    pub async fn pull<R: StoredRecord>(&self, user: &UserId) -> PullOutcome<R> {
        match self.fetch_row(user).await {
            Ok(row) => decode_column(row.as_ref()),
            Err(e) => PullOutcome::Failed(e),
        }
    }

    /// Bring the local store in line with the hosted copy
    ///
    /// A hosted collection replaces the local one unless it is missing, or
    /// is empty while local holds records.
    pub async fn reconcile(&self, user: &UserId, store: &mut EntityStore) -> ReconcileReport {
        let row = match self.fetch_row(user).await {
            Ok(row) => row,
            Err(e) => return ReconcileReport::all(ReconcileAction::Failed(e)),
        };

        let report = ReconcileReport {
            tasks: apply_pulled::<Task>(decode_column(row.as_ref()), store),
            events: apply_pulled::<Event>(decode_column(row.as_ref()), store),
            transactions: apply_pulled::<Transaction>(decode_column(row.as_ref()), store),
        };
        tracing::info!(
            "Reconciled {}: tasks {:?}, events {:?}, transactions {:?}",
            user,
            report.tasks,
            report.events,
            report.transactions
        );
        report
    }

    /// Refresh the cached subscription from the trusted account-status source
    pub async fn refresh_subscription(&self, user: &UserId, store: &mut EntityStore) -> Option<Subscription> {
        let fetched = self
            .bounded(self.remote.fetch_subscription(user.as_str()))
            .await;
        match fetched {
            Ok(Some(subscription)) => {
                if let Err(e) = store.save_subscription(&subscription) {
                    tracing::warn!("Caching subscription failed: {}", e);
                }
                Some(subscription)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Subscription fetch for {} failed: {}", user, e);
                None
            }
        }
    }
}

fn decode_column<R: StoredRecord>(row: Option<&UserDataRow>) -> PullOutcome<R> {
    let Some(column) = row.and_then(|r| r.column(R::KIND)) else {
        return PullOutcome::Missing;
    };
    match serde_json::from_value::<Vec<R>>(column.clone()) {
        Ok(records) => PullOutcome::Synced(records),
        Err(e) => {
            tracing::warn!("Hosted {} unreadable: {}", R::KIND.collection(), e);
            PullOutcome::Failed(e.to_string())
        }
    }
}

fn apply_pulled<R: StoredRecord>(outcome: PullOutcome<R>, store: &mut EntityStore) -> ReconcileAction {
    match outcome {
        PullOutcome::Missing => ReconcileAction::KeptLocal,
        PullOutcome::Failed(e) => ReconcileAction::Failed(e),
        PullOutcome::Synced(remote) => {
            // Unreadable local data is replaced rather than protected
            let local = store.try_get::<R>().map(|v| v.len()).unwrap_or(0);
            if remote.is_empty() && local > 0 {
                return ReconcileAction::KeptLocalOverEmptyRemote { local };
            }
            match store.save(&remote) {
                Ok(()) => ReconcileAction::ReplacedLocal {
                    count: remote.len(),
                },
                Err(e) => {
                    tracing::warn!("Saving pulled {} failed: {}", R::KIND.collection(), e);
                    ReconcileAction::Failed(e.to_string())
                }
            }
        }
    }
}
