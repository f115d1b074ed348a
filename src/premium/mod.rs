//! Subscription status and premium gating
//!
//! The premium flag is owned outside this crate: only the payment webhook
//! path or a trusted account-status fetch writes it. Everything here reads
//! it to decide what a session may do.

pub mod webhook;

pub use webhook::{apply_webhook, decide, PremiumChange, WebhookDecision, WebhookSource};

use crate::core::config::PlanLimits;
use crate::core::types::EntityKind;
use crate::entity::time_format::optional_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanName {
    #[default]
    Free,
    Premium,
}

/// Current subscription of the user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub is_premium: bool,
    #[serde(default)]
    pub plan_name: PlanName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub renewal_date: Option<NaiveDate>,
}

impl Subscription {
    pub fn free() -> Self {
        Self::default()
    }

    pub fn premium() -> Self {
        Self {
            is_premium: true,
            plan_name: PlanName::Premium,
            price: None,
            renewal_date: None,
        }
    }

    /// Whether the subscription unlocks `feature`
    pub fn allows(&self, feature: Feature) -> bool {
        self.is_premium || !feature.requires_premium()
    }

    /// Record cap for a collection, `None` when unlimited
    pub fn limit_for(&self, kind: EntityKind, limits: &PlanLimits) -> Option<usize> {
        if self.is_premium {
            return None;
        }
        Some(match kind {
            EntityKind::Task => limits.tasks,
            EntityKind::Event => limits.events,
            EntityKind::Transaction => limits.transactions,
        })
    }

    /// Whether one more record fits in a collection currently holding `current`
    pub fn can_create(&self, kind: EntityKind, current: usize, limits: &PlanLimits) -> bool {
        self.limit_for(kind, limits)
            .map(|limit| current < limit)
            .unwrap_or(true)
    }
}

/// Gated modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Tasks,
    Calendar,
    Finance,
    Backup,
    Assistant,
    WeekPlanner,
    FocusMode,
}

impl Feature {
    pub fn requires_premium(&self) -> bool {
        matches!(
            self,
            Feature::Assistant | Feature::WeekPlanner | Feature::FocusMode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_plan_limits() {
        let limits = PlanLimits::default();
        let free = Subscription::free();

        assert!(free.can_create(EntityKind::Task, 4, &limits));
        assert!(!free.can_create(EntityKind::Task, 5, &limits));
        assert_eq!(free.limit_for(EntityKind::Event, &limits), Some(5));
    }

    #[test]
    fn test_premium_is_unlimited() {
        let limits = PlanLimits::default();
        let premium = Subscription::premium();

        assert!(premium.can_create(EntityKind::Transaction, 10_000, &limits));
        assert_eq!(premium.limit_for(EntityKind::Task, &limits), None);
    }

    #[test]
    fn test_feature_gating() {
        let free = Subscription::free();
        assert!(free.allows(Feature::Tasks));
        assert!(free.allows(Feature::Backup));
        assert!(!free.allows(Feature::FocusMode));
        assert!(Subscription::premium().allows(Feature::Assistant));
    }

    #[test]
    fn test_wire_shape() {
        let json = r#"{"isPremium": true, "planName": "premium", "price": 19.9, "renewalDate": "2025-02-01"}"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert!(sub.is_premium);
        assert_eq!(sub.plan_name, PlanName::Premium);
        assert_eq!(sub.renewal_date, NaiveDate::from_ymd_opt(2025, 2, 1));

        let free: Subscription = serde_json::from_str(r#"{"isPremium": false}"#).unwrap();
        assert_eq!(free, Subscription::free());
    }
}
