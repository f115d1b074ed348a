//! Background push queue
//!
//! Mutations hand their persisted collection to a `SyncHandle` and move on.
//! A single worker task drains the queue in order, so pushes for one user
//! reach the hosted store in the order the mutations happened.

use crate::core::types::{EntityKind, UserId};
use crate::entity::StoredRecord;
use crate::sync::layer::{PushOutcome, SyncLayer};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug)]
enum SyncJob {
    Push { kind: EntityKind, records: Value },
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Counters reported when the worker stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub pushed: usize,
    pub failed: usize,
}

/// Cheap handle used to queue pushes
#[derive(Debug, Clone)]
pub struct SyncHandle {
    user: UserId,
    tx: mpsc::UnboundedSender<SyncJob>,
}

impl SyncHandle {
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Queue a push of the whole collection; never blocks
    pub fn schedule_push<R: StoredRecord>(&self, records: &[R]) {
        match serde_json::to_value(records) {
            Ok(value) => self.schedule_push_value(R::KIND, value),
            Err(e) => tracing::warn!("Serializing {} for sync failed: {}", R::KIND.collection(), e),
        }
    }

    pub fn schedule_push_value(&self, kind: EntityKind, records: Value) {
        if self.tx.send(SyncJob::Push { kind, records }).is_err() {
            tracing::warn!("Sync worker stopped; {} push dropped", kind.collection());
        }
    }

    /// Wait until every push queued before this call was attempted
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SyncJob::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

/// Owner of the background push task
pub struct SyncWorker {
    handle: SyncHandle,
    join: JoinHandle<SyncStats>,
}

impl SyncWorker {
    /// Start the worker on the current tokio runtime
    pub fn spawn(layer: SyncLayer, user: UserId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let join = tokio::spawn(run(layer, user.clone(), rx));
        Self {
            handle: SyncHandle { user, tx },
            join,
        }
    }

    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Finish queued pushes and stop
    pub async fn shutdown(self) -> SyncStats {
        let _ = self.handle.tx.send(SyncJob::Shutdown);
        match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("Sync worker panicked: {}", e);
                SyncStats::default()
            }
        }
    }
}

async fn run(layer: SyncLayer, user: UserId, mut rx: mpsc::UnboundedReceiver<SyncJob>) -> SyncStats {
    let mut stats = SyncStats::default();
    tracing::debug!("Sync worker started for {}", user);

    while let Some(job) = rx.recv().await {
        match job {
            SyncJob::Push { kind, records } => match layer.push(&user, kind, records).await {
                PushOutcome::Pushed => stats.pushed += 1,
                PushOutcome::Failed(_) => stats.failed += 1,
            },
            SyncJob::Flush(done) => {
                let _ = done.send(());
            }
            SyncJob::Shutdown => break,
        }
    }

    tracing::debug!(
        "Sync worker for {} stopped: {} pushed, {} failed",
        user,
        stats.pushed,
        stats.failed
    );
    stats
}
