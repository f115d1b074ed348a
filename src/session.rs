//! One user session: store + resolver + executor + sync
//!
//! A session owns the entity store. Hosted sync is optional; without it
//! every operation works purely locally.

use crate::backup::{Backup, BackupUser};
use crate::command::{ActionExecutor, BatchResult, Fallback, IntentResolver, Resolution};
use crate::core::config::{AppConfig, PlanLimits};
use crate::core::error::{OdrnaError, Result};
use crate::core::types::{EntityKind, UserId};
use crate::entity::{Event, Task, Transaction};
use crate::llm::{CompletionService, LlmClient};
use crate::premium::{Feature, Subscription};
use crate::store::EntityStore;
use crate::sync::{PushOutcome, ReconcileReport, RestHostedStore, SyncLayer, SyncStats, SyncWorker};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Result of one submitted utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub resolution: Resolution,
    pub batch: BatchResult,
}

impl Turn {
    /// Text shown to the user: the assistant reply, plus failures if any
    pub fn reply(&self) -> String {
        if self.batch.failed() == 0 {
            return self.resolution.response.clone();
        }
        format!("{}\n({})", self.resolution.response, self.batch.summary)
    }
}

struct HostedSync {
    layer: SyncLayer,
    worker: SyncWorker,
    user: UserId,
}

pub struct Session {
    store: EntityStore,
    resolver: IntentResolver,
    limits: PlanLimits,
    premium_only: bool,
    sync: Option<HostedSync>,
}

impl Session {
    /// Local-only session
    pub fn new(store: EntityStore, resolver: IntentResolver, config: &AppConfig) -> Self {
        Self {
            store,
            resolver,
            limits: config.plan,
            premium_only: config.assistant.premium_only,
            sync: None,
        }
    }

    /// Attach hosted sync. Spawns the push worker, so it must run inside a Tokio runtime.
    pub fn with_sync(mut self, layer: SyncLayer, user: UserId) -> Self {
        let worker = SyncWorker::spawn(layer.clone(), user.clone());
        self.sync = Some(HostedSync { layer, worker, user });
        self
    }

    /// Build a session from configuration
    ///
    /// Sync is attached when it is enabled and a user id is known.
    pub fn from_config(config: &AppConfig, data_dir: Option<PathBuf>, user: Option<String>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| config.storage.data_dir.clone());
        let store = EntityStore::open(&data_dir);

        let client = LlmClient::from_config(&config.llm)?;
        if !client.is_configured() {
            tracing::warn!("LLM_API_KEY not set - assistant commands will explain how to configure it");
        }
        let resolver = IntentResolver::new(Arc::new(client), Duration::from_secs(config.llm.timeout_secs));
        let session = Self::new(store, resolver, config);

        let user = user.or_else(|| config.sync.user_id.clone());
        match (config.sync.enabled, &config.sync.url, &config.sync.api_key, user) {
            (true, Some(url), Some(key), Some(user)) => {
                let timeout = Duration::from_secs(config.sync.timeout_secs);
                let remote = RestHostedStore::new(url.clone(), key.clone(), timeout)?;
                tracing::info!("Hosted sync enabled for user {}", user);
                Ok(session.with_sync(SyncLayer::new(Arc::new(remote), timeout), UserId::from(user)))
            }
            (true, _, _, None) => {
                tracing::warn!("Sync enabled but no user id given - running local only");
                Ok(session)
            }
            (true, _, _, _) => Err(OdrnaError::Config("sync enabled without url or api key".into())),
            _ => Ok(session),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn user(&self) -> Option<&UserId> {
        self.sync.as_ref().map(|s| &s.user)
    }

    pub fn is_synced(&self) -> bool {
        self.sync.is_some()
    }

    pub fn subscription(&self) -> Subscription {
        self.store.get_subscription()
    }

    /// Refresh the subscription and reconcile local data with the hosted copy
    pub async fn start(&mut self) -> Option<ReconcileReport> {
        let sync = self.sync.as_ref()?;
        sync.layer.refresh_subscription(&sync.user, &mut self.store).await;
        let report = sync.layer.reconcile(&sync.user, &mut self.store).await;
        Some(report)
    }

    /// Resolve an utterance and execute the resulting actions
    pub async fn submit(&mut self, input: &str) -> Turn {
        let subscription = self.subscription();

        let resolution = if self.premium_only && !subscription.allows(Feature::Assistant) {
            tracing::info!("Assistant request refused on the free plan");
            Resolution::fallback(Fallback::PremiumRequired)
        } else {
            let snapshot = self.store.snapshot();
            self.resolver.resolve(input, &snapshot).await
        };

        let handle = self.sync.as_ref().map(|s| s.worker.handle());
        let batch = ActionExecutor::new(&mut self.store, subscription, self.limits)
            .with_sync(handle.as_ref())
            .execute(&resolution.actions);

        if !batch.outcomes.is_empty() {
            tracing::info!("{}", batch.summary);
        }
        Turn { resolution, batch }
    }

    /// Wait for queued pushes, then push every collection again
    pub async fn sync_now(&self) -> Option<Vec<(EntityKind, PushOutcome)>> {
        let sync = self.sync.as_ref()?;
        sync.worker.handle().flush().await;
        Some(sync.layer.push_all(&sync.user, &self.store).await)
    }

    /// Pull hosted data into the store
    pub async fn pull_now(&mut self) -> Option<ReconcileReport> {
        let sync = self.sync.as_ref()?;
        Some(sync.layer.reconcile(&sync.user, &mut self.store).await)
    }

    pub fn export_backup(&self, user: BackupUser) -> Backup {
        Backup::export(&self.store, user)
    }

    /// Replace all local data with a backup and queue pushes of the result
    pub fn restore_backup(&mut self, backup: &Backup) -> Result<()> {
        backup.restore(&mut self.store)?;
        if let Some(sync) = &self.sync {
            let handle = sync.worker.handle();
            handle.schedule_push(&self.store.try_get::<Task>()?);
            handle.schedule_push(&self.store.try_get::<Event>()?);
            handle.schedule_push(&self.store.try_get::<Transaction>()?);
        }
        Ok(())
    }

    /// Drain the push queue and stop the worker
    pub async fn shutdown(self) -> Option<SyncStats> {
        let sync = self.sync?;
        Some(sync.worker.shutdown().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result as OdrnaResult;
    use crate::sync::MemoryHostedStore;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionService for Canned {
        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _system: &str, _user: &str) -> OdrnaResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn session(reply: &'static str, config: &AppConfig) -> Session {
        let resolver = IntentResolver::new(Arc::new(Canned(reply)), Duration::from_secs(5));
        Session::new(EntityStore::in_memory(), resolver, config)
    }

    const CREATE_TASK: &str =
        r#"{"actions": [{"type": "task", "action": "create", "data": {"title": "Ler"}}], "response": "Feito!"}"#;

    #[tokio::test]
    async fn test_submit_executes_actions() {
        let mut session = session(CREATE_TASK, &AppConfig::default());
        let turn = session.submit("crie a tarefa ler").await;

        assert_eq!(turn.batch.succeeded(), 1);
        assert_eq!(turn.reply(), "Feito!");
        assert_eq!(session.store().get_tasks().len(), 1);
        assert!(session.shutdown().await.is_none());
    }

    #[tokio::test]
    async fn test_premium_only_assistant() {
        let mut config = AppConfig::default();
        config.assistant.premium_only = true;
        let mut session = session(CREATE_TASK, &config);

        let turn = session.submit("crie a tarefa ler").await;
        assert_eq!(turn.resolution.fallback, Some(Fallback::PremiumRequired));
        assert!(session.store().get_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_synced_session_pushes_and_restores() {
        let remote = Arc::new(MemoryHostedStore::new());
        let layer = SyncLayer::new(remote.clone(), Duration::from_secs(5));
        let mut session = session(CREATE_TASK, &AppConfig::default()).with_sync(layer, UserId::from("u1"));

        session.start().await;
        session.submit("crie a tarefa ler").await;
        let backup = session.export_backup(BackupUser::default());
        session.restore_backup(&backup).unwrap();

        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.pushed, 4);
        let row = remote.row("u1").await.unwrap();
        assert_eq!(row.column(EntityKind::Task).and_then(|v| v.as_array()).map(|a| a.len()), Some(1));
    }
}
