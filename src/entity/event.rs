//! Calendar event records

use crate::core::types::RecordId;
use crate::entity::category::Category;
use crate::entity::time_format::{calendar_date, clock_time};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(default, with = "clock_time", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Derived, never stored: the event is today or later
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date >= today
    }
}
