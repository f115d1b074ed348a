//! Typed actions and their validation at the executor boundary
//!
//! `RawAction` is what the model produced. `Action::from_raw` turns it into
//! an exhaustively matched value, or an `ActionError` that is reported for
//! that one action.

use crate::command::heuristics::parse_money;
use crate::core::types::{EntityKind, RecordId, Verb};
use crate::entity::time_format::{parse_calendar_date, parse_clock_time};
use crate::entity::{Category, Priority, TransactionCategory, TransactionType};
use crate::llm::RawAction;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a single action was not applied
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("unknown entity type '{0}'")]
    UnknownKind(String),

    #[error("unknown action '{0}'")]
    UnknownVerb(String),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("no {} with id {}", .kind, .id)]
    NotFound { kind: EntityKind, id: RecordId },

    #[error("free plan allows {limit} {}; upgrade to premium for more", .kind.collection())]
    PlanLimitReached { kind: EntityKind, limit: usize },

    #[error("could not save: {0}")]
    Persist(String),
}

impl From<crate::core::error::OdrnaError> for ActionError {
    fn from(e: crate::core::error::OdrnaError) -> Self {
        ActionError::Persist(e.to_string())
    }
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub category: Category,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub description: String,
    pub amount: f64,
    pub kind: TransactionType,
    pub category: TransactionCategory,
    /// Defaults to the execution day
    pub date: Option<NaiveDate>,
}

/// Fields of a record to create; id and timestamps are assigned on execution
#[derive(Debug, Clone, PartialEq)]
pub enum NewRecord {
    Task(NewTask),
    Event(NewEvent),
    Transaction(NewTransaction),
}

impl NewRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            NewRecord::Task(_) => EntityKind::Task,
            NewRecord::Event(_) => EntityKind::Event,
            NewRecord::Transaction(_) => EntityKind::Transaction,
        }
    }
}

/// Partial task fields; `Some(None)` clears an optional field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<Option<NaiveTime>>,
    pub category: Option<Category>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub kind: Option<TransactionType>,
    pub category: Option<TransactionCategory>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordPatch {
    Task(TaskPatch),
    Event(EventPatch),
    Transaction(TransactionPatch),
}

impl RecordPatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordPatch::Task(_) => EntityKind::Task,
            RecordPatch::Event(_) => EntityKind::Event,
            RecordPatch::Transaction(_) => EntityKind::Transaction,
        }
    }
}

/// A validated action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create(NewRecord),
    Update { id: RecordId, patch: RecordPatch },
    Delete { kind: EntityKind, id: RecordId },
    List(EntityKind),
}

impl Action {
    pub fn kind(&self) -> EntityKind {
        match self {
            Action::Create(record) => record.kind(),
            Action::Update { patch, .. } => patch.kind(),
            Action::Delete { kind, .. } => *kind,
            Action::List(kind) => *kind,
        }
    }

    pub fn verb(&self) -> Verb {
        match self {
            Action::Create(_) => Verb::Create,
            Action::Update { .. } => Verb::Update,
            Action::Delete { .. } => Verb::Delete,
            Action::List(_) => Verb::List,
        }
    }

    /// Validate a raw action
    ///
    /// Unknown tags, missing required fields and out-of-range enum values
    /// are errors. Absent categories and priorities take their defaults.
    pub fn from_raw(raw: &RawAction) -> ActionResult<Self> {
        let kind: EntityKind = raw
            .kind
            .parse()
            .map_err(|_| ActionError::UnknownKind(raw.kind.clone()))?;
        let verb: Verb = raw
            .action
            .parse()
            .map_err(|_| ActionError::UnknownVerb(raw.action.clone()))?;

        let empty = Map::new();
        let data = match &raw.data {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ActionError::InvalidField {
                    field: "data",
                    reason: "expected an object".into(),
                })
            }
        };
        let fields = Fields(data);

        match verb {
            Verb::List => Ok(Action::List(kind)),
            Verb::Delete => Ok(Action::Delete {
                kind,
                id: fields.id()?,
            }),
            Verb::Create => Ok(Action::Create(match kind {
                EntityKind::Task => NewRecord::Task(new_task(&fields)?),
                EntityKind::Event => NewRecord::Event(new_event(&fields)?),
                EntityKind::Transaction => NewRecord::Transaction(new_transaction(&fields)?),
            })),
            Verb::Update => {
                let id = fields.id()?;
                // `{id, updates: {...}}`, or the fields inline next to the id
                let updates = match data.get("updates") {
                    Some(Value::Object(map)) => Fields(map),
                    Some(_) => {
                        return Err(ActionError::InvalidField {
                            field: "updates",
                            reason: "expected an object".into(),
                        })
                    }
                    None => fields,
                };
                let patch = match kind {
                    EntityKind::Task => RecordPatch::Task(task_patch(&updates)?),
                    EntityKind::Event => RecordPatch::Event(event_patch(&updates)?),
                    EntityKind::Transaction => RecordPatch::Transaction(transaction_patch(&updates)?),
                };
                Ok(Action::Update { id, patch })
            }
        }
    }
}

fn new_task(f: &Fields) -> ActionResult<NewTask> {
    Ok(NewTask {
        title: f.required_text("title")?,
        category: f.enum_or_default("category", Category::parse),
        priority: f.enum_or_default("priority", Priority::parse),
        due_date: f.date(&["dueDate", "due_date"])?,
        description: f.text("description")?,
    })
}

fn new_event(f: &Fields) -> ActionResult<NewEvent> {
    let (date, time_in_date) = f
        .date_time("date")?
        .ok_or(ActionError::MissingField("date"))?;
    Ok(NewEvent {
        title: f.required_text("title")?,
        date,
        time: f.time("time")?.or(time_in_date),
        category: f.enum_or_default("category", Category::parse),
        description: f.text("description")?,
        color: f.text("color")?,
    })
}

fn new_transaction(f: &Fields) -> ActionResult<NewTransaction> {
    let kind = f
        .strict_enum("type", TransactionType::parse)?
        .ok_or(ActionError::MissingField("type"))?;
    Ok(NewTransaction {
        description: f.required_text("description")?,
        amount: f.amount()?.ok_or(ActionError::MissingField("amount"))?,
        kind,
        category: f.enum_or_default("category", TransactionCategory::parse),
        date: f.date(&["date"])?,
    })
}

fn task_patch(f: &Fields) -> ActionResult<TaskPatch> {
    Ok(TaskPatch {
        title: f.text("title")?,
        completed: f.bool("completed")?,
        category: f.strict_enum("category", Category::parse)?,
        priority: f.strict_enum("priority", Priority::parse)?,
        due_date: f.clearable(&["dueDate", "due_date"], |f| f.date(&["dueDate", "due_date"]))?,
        description: f.clearable(&["description"], |f| f.text("description"))?,
    })
}

fn event_patch(f: &Fields) -> ActionResult<EventPatch> {
    let date_time = f.date_time("date")?;
    let time = match f.clearable(&["time"], |f| f.time("time"))? {
        Some(time) => Some(time),
        None => date_time.and_then(|(_, t)| t).map(Some),
    };
    Ok(EventPatch {
        title: f.text("title")?,
        date: date_time.map(|(d, _)| d),
        time,
        category: f.strict_enum("category", Category::parse)?,
        description: f.clearable(&["description"], |f| f.text("description"))?,
        color: f.clearable(&["color"], |f| f.text("color"))?,
    })
}

fn transaction_patch(f: &Fields) -> ActionResult<TransactionPatch> {
    Ok(TransactionPatch {
        description: f.text("description")?,
        amount: f.amount()?,
        kind: f.strict_enum("type", TransactionType::parse)?,
        category: f.strict_enum("category", TransactionCategory::parse)?,
        date: f.date(&["date"])?,
    })
}

/// Typed reads over an action payload
#[derive(Clone, Copy)]
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> ActionError {
        ActionError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Record ids are strings; numeric ids from older data are accepted
    fn id(&self) -> ActionResult<RecordId> {
        match self.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(RecordId::from(s.trim())),
            Some(Value::Number(n)) => Ok(RecordId::from(n.to_string())),
            Some(_) => Err(Self::invalid("id", "expected a string")),
            None => Err(ActionError::MissingField("id")),
        }
    }

    fn text(&self, name: &'static str) -> ActionResult<Option<String>> {
        match self.get(name) {
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(_) => Err(Self::invalid(name, "expected text")),
            None => Ok(None),
        }
    }

    fn required_text(&self, name: &'static str) -> ActionResult<String> {
        self.text(name)?.ok_or(ActionError::MissingField(name))
    }

    fn bool(&self, name: &'static str) -> ActionResult<Option<bool>> {
        match self.get(name) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "sim" | "yes" => Ok(Some(true)),
                "false" | "nao" | "não" | "no" => Ok(Some(false)),
                _ => Err(Self::invalid(name, format!("'{}' is not a boolean", s))),
            },
            Some(_) => Err(Self::invalid(name, "expected a boolean")),
            None => Ok(None),
        }
    }

    /// Out-of-range values are rejected
    fn strict_enum<T>(&self, name: &'static str, parse: fn(&str) -> Option<T>) -> ActionResult<Option<T>> {
        match self.text(name)? {
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| Self::invalid(name, format!("'{}' is not allowed", s))),
            None => Ok(None),
        }
    }

    /// Absent or out-of-range values take the default
    fn enum_or_default<T: Default>(&self, name: &'static str, parse: fn(&str) -> Option<T>) -> T {
        match self.get(name).and_then(Value::as_str) {
            Some(s) => parse(s).unwrap_or_else(|| {
                tracing::debug!("Coercing {} '{}' to default", name, s);
                T::default()
            }),
            None => T::default(),
        }
    }

    fn date_time(&self, name: &'static str) -> ActionResult<Option<(NaiveDate, Option<NaiveTime>)>> {
        match self.text(name)? {
            Some(s) => parse_calendar_date(&s)
                .map(Some)
                .ok_or_else(|| Self::invalid(name, format!("'{}' is not a calendar date", s))),
            None => Ok(None),
        }
    }

    /// First of `names` holding a date
    fn date(&self, names: &[&'static str]) -> ActionResult<Option<NaiveDate>> {
        for name in names {
            if let Some((date, _)) = self.date_time(name)? {
                return Ok(Some(date));
            }
        }
        Ok(None)
    }

    fn time(&self, name: &'static str) -> ActionResult<Option<NaiveTime>> {
        match self.text(name)? {
            Some(s) => parse_clock_time(&s)
                .map(Some)
                .ok_or_else(|| Self::invalid(name, format!("'{}' is not a time of day", s))),
            None => Ok(None),
        }
    }

    fn amount(&self) -> ActionResult<Option<f64>> {
        let value = match self.get("amount") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => parse_money(s),
            Some(_) => None,
            None => return Ok(None),
        };
        match value {
            Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
            Some(v) if v.is_finite() => Err(Self::invalid("amount", "must be a non-negative magnitude")),
            _ => Err(Self::invalid("amount", "expected a number")),
        }
    }

    /// Present-but-null means "clear"; absent means "keep"
    fn clearable<T>(
        &self,
        names: &[&str],
        read: impl FnOnce(&Self) -> ActionResult<Option<T>>,
    ) -> ActionResult<Option<Option<T>>> {
        let present = names.iter().any(|n| self.0.contains_key(*n));
        if !present {
            return Ok(None);
        }
        let value = read(self)?;
        let explicit_clear = names.iter().any(|n| match self.0.get(*n) {
            Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            _ => false,
        });
        match value {
            Some(v) => Ok(Some(Some(v))),
            None if explicit_clear => Ok(Some(None)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: &str, action: &str, data: Value) -> RawAction {
        RawAction {
            kind: kind.into(),
            action: action.into(),
            data,
        }
    }

    #[test]
    fn test_create_task_defaults() {
        let action = Action::from_raw(&raw("task", "create", json!({"title": "Ler"}))).unwrap();
        let Action::Create(NewRecord::Task(task)) = action else {
            panic!("expected a task create");
        };
        assert_eq!(task.title, "Ler");
        assert_eq!(task.category, Category::Personal);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn test_unknown_tags_rejected() {
        assert_eq!(
            Action::from_raw(&raw("note", "create", json!({}))),
            Err(ActionError::UnknownKind("note".into()))
        );
        assert_eq!(
            Action::from_raw(&raw("task", "archive", json!({}))),
            Err(ActionError::UnknownVerb("archive".into()))
        );
    }

    #[test]
    fn test_missing_required_fields() {
        assert_eq!(
            Action::from_raw(&raw("task", "create", json!({"category": "estudos"}))),
            Err(ActionError::MissingField("title"))
        );
        assert_eq!(
            Action::from_raw(&raw("event", "create", json!({"title": "Reunião"}))),
            Err(ActionError::MissingField("date"))
        );
        assert_eq!(
            Action::from_raw(&raw("task", "delete", json!({}))),
            Err(ActionError::MissingField("id"))
        );
    }

    #[test]
    fn test_event_time_from_timestamp() {
        let action = Action::from_raw(&raw(
            "event",
            "create",
            json!({"title": "Lavar a louça", "date": "2024-01-15T18:00:00"}),
        ))
        .unwrap();
        let Action::Create(NewRecord::Event(event)) = action else {
            panic!("expected an event create");
        };
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(event.time, NaiveTime::from_hms_opt(18, 0, 0));
    }

    #[test]
    fn test_transaction_validation() {
        let ok = Action::from_raw(&raw(
            "transaction",
            "create",
            json!({"description": "Salário", "amount": "R$ 1.400,00", "type": "receita", "category": "salario"}),
        ))
        .unwrap();
        let Action::Create(NewRecord::Transaction(tx)) = ok else {
            panic!("expected a transaction create");
        };
        assert_eq!(tx.amount, 1400.0);
        assert_eq!(tx.kind, TransactionType::Income);

        let negative = Action::from_raw(&raw(
            "transaction",
            "create",
            json!({"description": "x", "amount": -5, "type": "expense"}),
        ));
        assert!(matches!(negative, Err(ActionError::InvalidField { field: "amount", .. })));

        let bad_type = Action::from_raw(&raw(
            "transaction",
            "create",
            json!({"description": "x", "amount": 5, "type": "transfer"}),
        ));
        assert!(matches!(bad_type, Err(ActionError::InvalidField { field: "type", .. })));
    }

    #[test]
    fn test_update_shapes() {
        let nested = Action::from_raw(&raw(
            "task",
            "update",
            json!({"id": "abc", "updates": {"completed": true}}),
        ))
        .unwrap();
        let inline = Action::from_raw(&raw("task", "update", json!({"id": "abc", "completed": true}))).unwrap();
        assert_eq!(nested, inline);

        let Action::Update { id, patch: RecordPatch::Task(patch) } = nested else {
            panic!("expected a task update");
        };
        assert_eq!(id.as_str(), "abc");
        assert_eq!(patch.completed, Some(true));
        assert_eq!(patch.title, None);
    }

    #[test]
    fn test_patch_rejects_unknown_category() {
        let result = Action::from_raw(&raw(
            "task",
            "update",
            json!({"id": "1", "updates": {"category": "hobby"}}),
        ));
        assert!(matches!(result, Err(ActionError::InvalidField { field: "category", .. })));
    }

    #[test]
    fn test_patch_can_clear_due_date() {
        let action = Action::from_raw(&raw(
            "task",
            "update",
            json!({"id": 42, "updates": {"dueDate": null}}),
        ))
        .unwrap();
        let Action::Update { id, patch: RecordPatch::Task(patch) } = action else {
            panic!("expected a task update");
        };
        assert_eq!(id.as_str(), "42");
        assert_eq!(patch.due_date, Some(None));
    }
}
