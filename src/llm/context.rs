//! Gather the user's current data for assistant prompts
//!
//! The model needs record ids to target updates and deletes, and the
//! current moment to turn relative dates into calendar dates.

use crate::entity::Snapshot;
use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::Serialize;

/// Most recent records of each collection included in a prompt
pub const MAX_RECORDS_IN_PROMPT: usize = 50;

/// Assistant context for one utterance
pub struct AssistantContext<'a> {
    pub snapshot: &'a Snapshot,
    /// Reference moment for relative dates (local wall clock)
    pub now: NaiveDateTime,
}

impl<'a> AssistantContext<'a> {
    pub fn new(snapshot: &'a Snapshot, now: NaiveDateTime) -> Self {
        Self { snapshot, now }
    }

    /// Summarize the context as prompt text
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "DATA E HORA ATUAL: {} ({})",
            self.now.format("%Y-%m-%dT%H:%M:%S"),
            weekday_name(self.now.weekday())
        ));
        lines.push(format!("- Tarefas existentes: {}", recent_json(&self.snapshot.tasks)));
        lines.push(format!("- Eventos existentes: {}", recent_json(&self.snapshot.events)));
        lines.push(format!(
            "- Transações existentes: {}",
            recent_json(&self.snapshot.transactions)
        ));

        lines.join("\n")
    }
}

fn recent_json<T: Serialize>(records: &[T]) -> String {
    let start = records.len().saturating_sub(MAX_RECORDS_IN_PROMPT);
    serde_json::to_string(&records[start..]).unwrap_or_else(|_| "[]".into())
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "segunda-feira",
        Weekday::Tue => "terça-feira",
        Weekday::Wed => "quarta-feira",
        Weekday::Thu => "quinta-feira",
        Weekday::Fri => "sexta-feira",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Category, Task};
    use chrono::{NaiveDate, Utc};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_summary_has_time_and_collections() {
        let snapshot = Snapshot::default();
        let summary = AssistantContext::new(&snapshot, now()).summary();

        assert!(summary.contains("2025-01-14T10:00:00"));
        assert!(summary.contains("terça-feira"));
        assert!(summary.contains("Tarefas existentes: []"));
        assert!(summary.contains("Transações existentes: []"));
    }

    #[test]
    fn test_summary_caps_records() {
        let tasks: Vec<Task> = (0..MAX_RECORDS_IN_PROMPT + 5)
            .map(|i| Task::new(format!("tarefa-{}", i), Category::Work, Utc::now()))
            .collect();
        let snapshot = Snapshot {
            tasks,
            ..Snapshot::default()
        };
        let summary = AssistantContext::new(&snapshot, now()).summary();

        assert!(!summary.contains("\"tarefa-0\""));
        assert!(summary.contains(&format!("tarefa-{}", MAX_RECORDS_IN_PROMPT + 4)));
    }
}
