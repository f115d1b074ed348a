//! Task records

use crate::core::types::RecordId;
use crate::entity::category::{Category, Priority};
use crate::entity::time_format::optional_date;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>, category: Category, created_at: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            title: title.into(),
            completed: false,
            category,
            priority: Priority::default(),
            due_date: None,
            description: None,
            created_at,
        }
    }

    /// Open task whose due date has passed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.map(|due| due < today).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_record_loads() {
        let json = r#"{
            "id": "1700000000000",
            "title": "Estudar inglês",
            "completed": false,
            "category": "estudos",
            "priority": "high",
            "dueDate": "2024-01-20",
            "createdAt": "2024-01-15T10:00:00.000Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id.as_str(), "1700000000000");
        assert_eq!(task.category, Category::Study);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 1, 20));
        assert!(task.description.is_none());
    }

    #[test]
    fn test_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut task = Task::new("Relatório", Category::Work, Utc::now());
        assert!(!task.is_overdue(today));

        task.due_date = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert!(task.is_overdue(today));

        task.completed = true;
        assert!(!task.is_overdue(today));
    }
}
