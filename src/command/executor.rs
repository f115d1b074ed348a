//! Action execution - applies validated actions to the entity store
//!
//! Each action succeeds or fails on its own; a failure is recorded in the
//! batch result and the next action still runs. Every persisted mutation
//! queues a push of the whole collection without waiting for it.

use crate::command::action::{
    Action, ActionError, ActionResult, EventPatch, NewEvent, NewRecord, NewTask, NewTransaction,
    RecordPatch, TaskPatch, TransactionPatch,
};
use crate::core::config::PlanLimits;
use crate::core::types::{EntityKind, RecordId};
use crate::entity::{Collection, Event, Record, StoredRecord, Task, Transaction};
use crate::llm::RawAction;
use crate::premium::Subscription;
use crate::store::EntityStore;
use crate::sync::SyncHandle;
use chrono::{DateTime, Local, NaiveDate, Utc};

/// What a successful action did
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEffect {
    Created(Record),
    Updated(Record),
    /// `existed` is false when the id was already absent
    Deleted { kind: EntityKind, id: RecordId, existed: bool },
    Listed(Collection),
}

/// Result of one action of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Position in the batch
    pub index: usize,
    /// Tags as received, for reporting
    pub kind: String,
    pub verb: String,
    pub result: ActionResult<ActionEffect>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of executing a whole batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub outcomes: Vec<ActionOutcome>,
    pub summary: String,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ActionOutcome, &ActionError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }
}

/// Applies actions for one session
pub struct ActionExecutor<'a> {
    store: &'a mut EntityStore,
    subscription: Subscription,
    limits: PlanLimits,
    sync: Option<&'a SyncHandle>,
    now: DateTime<Utc>,
    today: NaiveDate,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(store: &'a mut EntityStore, subscription: Subscription, limits: PlanLimits) -> Self {
        Self {
            store,
            subscription,
            limits,
            sync: None,
            now: Utc::now(),
            today: Local::now().date_naive(),
        }
    }

    /// Queue hosted pushes after each mutation
    pub fn with_sync(mut self, sync: Option<&'a SyncHandle>) -> Self {
        self.sync = sync;
        self
    }

    /// Fix the clock used for timestamps and default dates
    pub fn at(mut self, now: DateTime<Utc>, today: NaiveDate) -> Self {
        self.now = now;
        self.today = today;
        self
    }

    /// Execute actions in order
    pub fn execute(&mut self, actions: &[RawAction]) -> BatchResult {
        let outcomes: Vec<ActionOutcome> = actions
            .iter()
            .enumerate()
            .map(|(index, raw)| self.execute_one(index, raw))
            .collect();
        let summary = summarize(&outcomes);
        BatchResult { outcomes, summary }
    }

    fn execute_one(&mut self, index: usize, raw: &RawAction) -> ActionOutcome {
        let result = Action::from_raw(raw).and_then(|action| self.apply(action));
        match &result {
            Ok(_) => tracing::debug!("Action #{} {} {} applied", index + 1, raw.action, raw.kind),
            Err(e) => tracing::warn!("Action #{} {} {} failed: {}", index + 1, raw.action, raw.kind, e),
        }
        ActionOutcome {
            index,
            kind: raw.kind.clone(),
            verb: raw.action.clone(),
            result,
        }
    }

    /// Apply one validated action
    pub fn apply(&mut self, action: Action) -> ActionResult<ActionEffect> {
        match action {
            Action::List(kind) => Ok(ActionEffect::Listed(self.store.collection(kind))),
            Action::Create(record) => self.create(record),
            Action::Update { id, patch } => match patch {
                RecordPatch::Task(p) => self.update::<Task>(&id, |t| apply_task_patch(t, p)),
                RecordPatch::Event(p) => self.update::<Event>(&id, |e| apply_event_patch(e, p)),
                RecordPatch::Transaction(p) => {
                    self.update::<Transaction>(&id, |t| apply_transaction_patch(t, p))
                }
            },
            Action::Delete { kind, id } => match kind {
                EntityKind::Task => self.delete::<Task>(id),
                EntityKind::Event => self.delete::<Event>(id),
                EntityKind::Transaction => self.delete::<Transaction>(id),
            },
        }
    }

    fn create(&mut self, record: NewRecord) -> ActionResult<ActionEffect> {
        let kind = record.kind();
        if let Some(limit) = self.subscription.limit_for(kind, &self.limits) {
            if self.store.count(kind) >= limit {
                return Err(ActionError::PlanLimitReached { kind, limit });
            }
        }

        let created = match record {
            NewRecord::Task(new) => {
                let id = self.fresh_id::<Task>();
                self.insert(build_task(new, id, self.now))?
            }
            NewRecord::Event(new) => {
                let id = self.fresh_id::<Event>();
                self.insert(build_event(new, id, self.now))?
            }
            NewRecord::Transaction(new) => {
                let id = self.fresh_id::<Transaction>();
                self.insert(build_transaction(new, id, self.now, self.today))?
            }
        };
        Ok(ActionEffect::Created(created))
    }

    /// Random ids are regenerated on the unlikely collision with an existing one
    fn fresh_id<R: StoredRecord>(&self) -> RecordId {
        let existing: Vec<R> = self.store.get();
        loop {
            let id = RecordId::new();
            if !existing.iter().any(|r| r.id() == &id) {
                return id;
            }
            tracing::warn!("Generated id {} already in use, retrying", id);
        }
    }

    fn insert<R: StoredRecord>(&mut self, record: R) -> ActionResult<Record> {
        let record = self.store.add(record)?;
        self.schedule_push::<R>();
        Ok(record.into_record())
    }

    fn update<R: StoredRecord>(&mut self, id: &RecordId, apply: impl FnOnce(&mut R)) -> ActionResult<ActionEffect> {
        match self.store.update::<R>(id, apply)? {
            Some(updated) => {
                self.schedule_push::<R>();
                Ok(ActionEffect::Updated(updated.into_record()))
            }
            None => Err(ActionError::NotFound {
                kind: R::KIND,
                id: id.clone(),
            }),
        }
    }

    fn delete<R: StoredRecord>(&mut self, id: RecordId) -> ActionResult<ActionEffect> {
        let existed = self.store.delete::<R>(&id)?;
        if existed {
            self.schedule_push::<R>();
        }
        Ok(ActionEffect::Deleted {
            kind: R::KIND,
            id,
            existed,
        })
    }

    fn schedule_push<R: StoredRecord>(&self) {
        let Some(sync) = self.sync else {
            return;
        };
        match self.store.try_get::<R>() {
            Ok(records) => sync.schedule_push(&records),
            Err(e) => tracing::warn!("Not pushing {}: {}", R::KIND.collection(), e),
        }
    }
}

fn build_task(new: NewTask, id: RecordId, now: DateTime<Utc>) -> Task {
    Task {
        id,
        title: new.title,
        completed: false,
        category: new.category,
        priority: new.priority,
        due_date: new.due_date,
        description: new.description,
        created_at: now,
    }
}

fn build_event(new: NewEvent, id: RecordId, now: DateTime<Utc>) -> Event {
    Event {
        id,
        title: new.title,
        date: new.date,
        time: new.time,
        category: new.category,
        description: new.description,
        color: new.color,
        created_at: now,
    }
}

fn build_transaction(new: NewTransaction, id: RecordId, now: DateTime<Utc>, today: NaiveDate) -> Transaction {
    Transaction {
        id,
        description: new.description,
        amount: new.amount,
        kind: new.kind,
        category: new.category,
        date: new.date.unwrap_or(today),
        created_at: now,
    }
}

// Shallow merge: only fields present in the patch change

fn apply_task_patch(task: &mut Task, patch: TaskPatch) {
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(completed) = patch.completed {
        task.completed = completed;
    }
    if let Some(category) = patch.category {
        task.category = category;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
}

fn apply_event_patch(event: &mut Event, patch: EventPatch) {
    if let Some(title) = patch.title {
        event.title = title;
    }
    if let Some(date) = patch.date {
        event.date = date;
    }
    if let Some(time) = patch.time {
        event.time = time;
    }
    if let Some(category) = patch.category {
        event.category = category;
    }
    if let Some(description) = patch.description {
        event.description = description;
    }
    if let Some(color) = patch.color {
        event.color = color;
    }
}

fn apply_transaction_patch(tx: &mut Transaction, patch: TransactionPatch) {
    if let Some(description) = patch.description {
        tx.description = description;
    }
    if let Some(amount) = patch.amount {
        tx.amount = amount;
    }
    if let Some(kind) = patch.kind {
        tx.kind = kind;
    }
    if let Some(category) = patch.category {
        tx.category = category;
    }
    if let Some(date) = patch.date {
        tx.date = date;
    }
}

fn summarize(outcomes: &[ActionOutcome]) -> String {
    if outcomes.is_empty() {
        return "No actions to apply".into();
    }
    let ok = outcomes.iter().filter(|o| o.is_success()).count();
    let mut summary = format!("{} of {} action(s) applied", ok, outcomes.len());
    let failures: Vec<String> = outcomes
        .iter()
        .filter_map(|o| {
            o.result
                .as_ref()
                .err()
                .map(|e| format!("#{} {} {}: {}", o.index + 1, o.verb, o.kind, e))
        })
        .collect();
    if !failures.is_empty() {
        summary.push_str("; failed: ");
        summary.push_str(&failures.join(", "));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Category, TransactionType};
    use serde_json::json;

    fn raw(kind: &str, action: &str, data: serde_json::Value) -> RawAction {
        RawAction {
            kind: kind.into(),
            action: action.into(),
            data,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()
    }

    fn executor(store: &mut EntityStore, subscription: Subscription) -> ActionExecutor<'_> {
        ActionExecutor::new(store, subscription, PlanLimits::default()).at(Utc::now(), today())
    }

    #[test]
    fn test_create_assigns_id_and_timestamp() {
        let mut store = EntityStore::in_memory();
        let result = executor(&mut store, Subscription::premium()).execute(&[raw(
            "task",
            "create",
            json!({"title": "Estudar inglês", "category": "estudos"}),
        )]);

        assert_eq!(result.succeeded(), 1);
        let Ok(ActionEffect::Created(Record::Task(task))) = &result.outcomes[0].result else {
            panic!("expected a created task");
        };
        assert_eq!(task.category, Category::Study);
        assert!(!task.id.as_str().is_empty());
        assert_eq!(store.get_tasks(), vec![task.clone()]);
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let mut store = EntityStore::in_memory();
        let result = executor(&mut store, Subscription::premium()).execute(&[
            raw("task", "update", json!({"id": "missing", "updates": {"completed": true}})),
            raw("note", "create", json!({})),
            raw("task", "create", json!({"title": "Ler"})),
        ]);

        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.failed(), 2);
        assert!(matches!(
            result.outcomes[0].result,
            Err(ActionError::NotFound { kind: EntityKind::Task, .. })
        ));
        assert!(result.summary.contains("1 of 3"));
        assert_eq!(store.get_tasks().len(), 1);
    }

    #[test]
    fn test_update_merges_fields() {
        let mut store = EntityStore::in_memory();
        let created = executor(&mut store, Subscription::premium()).execute(&[raw(
            "task",
            "create",
            json!({"title": "Relatório", "priority": "high", "dueDate": "2025-01-20"}),
        )]);
        let Ok(ActionEffect::Created(record)) = &created.outcomes[0].result else {
            panic!("create failed");
        };
        let id = record.id().clone();

        executor(&mut store, Subscription::premium()).execute(&[raw(
            "task",
            "update",
            json!({"id": id.as_str(), "updates": {"completed": true}}),
        )]);

        let task = &store.get_tasks()[0];
        assert!(task.completed);
        assert_eq!(task.title, "Relatório");
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 1, 20));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = EntityStore::in_memory();
        let task = store
            .add(Task::new("Ler", Category::Study, Utc::now()))
            .unwrap();
        let delete = raw("task", "delete", json!({"id": task.id.as_str()}));

        let first = executor(&mut store, Subscription::premium()).execute(&[delete.clone()]);
        let after_first = store.get_tasks();
        let second = executor(&mut store, Subscription::premium()).execute(&[delete]);

        assert!(matches!(
            first.outcomes[0].result,
            Ok(ActionEffect::Deleted { existed: true, .. })
        ));
        assert!(matches!(
            second.outcomes[0].result,
            Ok(ActionEffect::Deleted { existed: false, .. })
        ));
        assert_eq!(store.get_tasks(), after_first);
    }

    #[test]
    fn test_free_plan_limit() {
        let mut store = EntityStore::in_memory();
        let actions: Vec<RawAction> = (0..6)
            .map(|i| raw("task", "create", json!({"title": format!("t{}", i)})))
            .collect();
        let result = executor(&mut store, Subscription::free()).execute(&actions);

        assert_eq!(result.succeeded(), 5);
        assert!(matches!(
            result.outcomes[5].result,
            Err(ActionError::PlanLimitReached { kind: EntityKind::Task, limit: 5 })
        ));
    }

    #[test]
    fn test_list_reads_live_collection() {
        let mut store = EntityStore::in_memory();
        let result = executor(&mut store, Subscription::free()).execute(&[
            raw("transaction", "create", json!({"description": "Mercado", "amount": 50, "type": "expense"})),
            raw("transaction", "list", json!({})),
        ]);

        let Ok(ActionEffect::Listed(Collection::Transactions(list))) = &result.outcomes[1].result else {
            panic!("expected a transaction list");
        };
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, TransactionType::Expense);
        assert_eq!(list[0].date, today());
    }

    #[tokio::test]
    async fn test_mutations_queue_pushes() {
        use crate::core::types::UserId;
        use crate::sync::{MemoryHostedStore, SyncLayer, SyncWorker};
        use std::sync::Arc;
        use std::time::Duration;

        let remote = Arc::new(MemoryHostedStore::new());
        let worker = SyncWorker::spawn(
            SyncLayer::new(remote.clone(), Duration::from_secs(5)),
            UserId::from("u1"),
        );
        let handle = worker.handle();

        let mut store = EntityStore::in_memory();
        ActionExecutor::new(&mut store, Subscription::premium(), PlanLimits::default())
            .with_sync(Some(&handle))
            .execute(&[
                raw("task", "create", json!({"title": "A"})),
                raw("task", "list", json!({})),
                raw("event", "create", json!({"title": "B", "date": "2025-02-01"})),
            ]);
        handle.flush().await;

        let stats = worker.shutdown().await;
        assert_eq!(stats.pushed, 2);
        let row = remote.row("u1").await.unwrap();
        assert!(row.column(EntityKind::Task).is_some());
        assert!(row.column(EntityKind::Event).is_some());
    }

    #[tokio::test]
    async fn test_corrupt_collection_is_never_pushed() {
        use crate::core::types::UserId;
        use crate::store::{storage_key, MemoryBackend, StorageBackend};
        use crate::sync::{MemoryHostedStore, SyncLayer, SyncWorker};
        use std::sync::Arc;
        use std::time::Duration;

        let remote = Arc::new(MemoryHostedStore::new());
        let layer = SyncLayer::new(remote.clone(), Duration::from_secs(5));
        let user = UserId::from("u1");
        layer
            .push_records(&user, &[Task::new("Remoto", Category::Personal, Utc::now())])
            .await;
        let worker = SyncWorker::spawn(layer, user);
        let handle = worker.handle();

        let mut backend = MemoryBackend::new();
        backend
            .write(storage_key(EntityKind::Task), r#"[{"id":"1","title":"x"}]"#)
            .unwrap();
        let mut store = EntityStore::new(backend);
        let batch = ActionExecutor::new(&mut store, Subscription::premium(), PlanLimits::default())
            .with_sync(Some(&handle))
            .execute(&[
                raw("task", "delete", json!({"id": "1"})),
                raw("event", "create", json!({"title": "B", "date": "2025-02-01"})),
            ]);
        assert_eq!(batch.failed(), 1);
        handle.flush().await;

        let stats = worker.shutdown().await;
        assert_eq!(stats.pushed, 1);
        let row = remote.row("u1").await.unwrap();
        let hosted = row.column(EntityKind::Task).and_then(|v| v.as_array()).unwrap();
        assert_eq!(hosted.len(), 1);
    }
}
