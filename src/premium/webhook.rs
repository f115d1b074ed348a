//! Payment webhook handling
//!
//! Maps provider notifications to a premium flag change keyed by the
//! payer's email. Authenticity of the inbound call is checked by whoever
//! receives it; payloads reaching this module are already trusted.

use crate::core::error::Result;
use crate::premium::Subscription;
use crate::sync::HostedStore;
use serde_json::Value;
use std::str::FromStr;

/// Payment provider that sent the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookSource {
    /// Stripe event object (`type` + `data.object`)
    Stripe,
    /// MercadoPago preapproval resource (`status` + `payer_email`)
    MercadoPago,
}

impl FromStr for WebhookSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stripe" => Ok(WebhookSource::Stripe),
            "mercadopago" | "mp" => Ok(WebhookSource::MercadoPago),
            other => Err(format!("unknown webhook source '{}'", other)),
        }
    }
}

/// Premium status to write for one payer
#[derive(Debug, Clone, PartialEq)]
pub struct PremiumChange {
    pub email: String,
    pub is_premium: bool,
    /// Provider event or status that triggered the change
    pub trigger: String,
}

impl PremiumChange {
    pub fn subscription(&self) -> Subscription {
        if self.is_premium {
            Subscription::premium()
        } else {
            Subscription::free()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDecision {
    Apply(PremiumChange),
    /// Acknowledged without changing anything
    Ignored(String),
}

/// Decide what a webhook payload means for the premium flag
pub fn decide(source: WebhookSource, payload: &Value) -> WebhookDecision {
    match source {
        WebhookSource::Stripe => decide_stripe(payload),
        WebhookSource::MercadoPago => decide_mercadopago(payload),
    }
}

fn decide_stripe(payload: &Value) -> WebhookDecision {
    let Some(event_type) = payload.get("type").and_then(Value::as_str) else {
        return WebhookDecision::Ignored("missing event type".into());
    };
    let object = &payload["data"]["object"];

    let is_premium = match event_type {
        "checkout.session.completed" | "invoice.payment_succeeded" => true,
        "invoice.payment_failed" | "customer.subscription.deleted" => false,
        "customer.subscription.updated" => object.get("status").and_then(Value::as_str) == Some("active"),
        other => return WebhookDecision::Ignored(format!("unhandled event '{}'", other)),
    };

    match stripe_email(object) {
        Some(email) => WebhookDecision::Apply(PremiumChange {
            email,
            is_premium,
            trigger: event_type.to_string(),
        }),
        None => WebhookDecision::Ignored(format!("no customer email in '{}'", event_type)),
    }
}

fn stripe_email(object: &Value) -> Option<String> {
    [
        &object["customer_email"],
        &object["customer_details"]["email"],
        &object["email"],
    ]
    .into_iter()
    .filter_map(Value::as_str)
    .map(str::trim)
    .find(|e| !e.is_empty())
    .map(str::to_string)
}

fn decide_mercadopago(payload: &Value) -> WebhookDecision {
    let Some(status) = payload.get("status").and_then(Value::as_str) else {
        return WebhookDecision::Ignored("missing preapproval status".into());
    };

    let is_premium = match status {
        "authorized" | "approved" => true,
        "paused" | "cancelled" | "expired" | "rejected" => false,
        other => return WebhookDecision::Ignored(format!("unhandled status '{}'", other)),
    };

    match payload
        .get("payer_email")
        .and_then(Value::as_str)
        .filter(|e| !e.trim().is_empty())
    {
        Some(email) => WebhookDecision::Apply(PremiumChange {
            email: email.trim().to_string(),
            is_premium,
            trigger: status.to_string(),
        }),
        None => WebhookDecision::Ignored("no payer email".into()),
    }
}

/// Decide and write the resulting premium flag to the hosted store
///
/// Returns the decision that was applied. Writing to a payer with no
/// matching account is logged and not treated as an error.
pub async fn apply_webhook(
    store: &dyn HostedStore,
    source: WebhookSource,
    payload: &Value,
) -> Result<WebhookDecision> {
    let decision = decide(source, payload);

    match &decision {
        WebhookDecision::Apply(change) => {
            let matched = store
                .set_premium_by_email(&change.email, &change.subscription())
                .await?;
            if matched {
                tracing::info!(
                    "Premium for {} set to {} ({})",
                    change.email,
                    change.is_premium,
                    change.trigger
                );
            } else {
                tracing::warn!("No account found for payer {}", change.email);
            }
        }
        WebhookDecision::Ignored(reason) => {
            tracing::info!("Webhook ignored: {}", reason);
        }
    }

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::premium::PlanName;
    use crate::sync::MemoryHostedStore;
    use serde_json::json;

    #[test]
    fn test_checkout_completed_grants_premium() {
        let payload = json!({
            "type": "checkout.session.completed",
            "data": {"object": {"customer_details": {"email": "ana@example.com"}}}
        });
        let WebhookDecision::Apply(change) = decide(WebhookSource::Stripe, &payload) else {
            panic!("expected a change");
        };
        assert_eq!(change.email, "ana@example.com");
        assert!(change.is_premium);
    }

    #[test]
    fn test_subscription_updated_follows_status() {
        let payload = json!({
            "type": "customer.subscription.updated",
            "data": {"object": {"status": "past_due", "email": "ana@example.com"}}
        });
        match decide(WebhookSource::Stripe, &payload) {
            WebhookDecision::Apply(change) => assert!(!change.is_premium),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_payment_failed_revokes() {
        let payload = json!({
            "type": "invoice.payment_failed",
            "data": {"object": {"customer_email": "bia@example.com"}}
        });
        match decide(WebhookSource::Stripe, &payload) {
            WebhookDecision::Apply(change) => {
                assert!(!change.is_premium);
                assert_eq!(change.subscription().plan_name, PlanName::Free);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_stripe_event_ignored() {
        let payload = json!({"type": "charge.refunded", "data": {"object": {}}});
        assert!(matches!(
            decide(WebhookSource::Stripe, &payload),
            WebhookDecision::Ignored(_)
        ));
    }

    #[test]
    fn test_missing_email_ignored() {
        let payload = json!({"type": "invoice.payment_succeeded", "data": {"object": {}}});
        assert!(matches!(
            decide(WebhookSource::Stripe, &payload),
            WebhookDecision::Ignored(_)
        ));
    }

    #[test]
    fn test_mercadopago_statuses() {
        let authorized = json!({"status": "authorized", "payer_email": "c@example.com"});
        let cancelled = json!({"status": "cancelled", "payer_email": "c@example.com"});
        let pending = json!({"status": "pending", "payer_email": "c@example.com"});

        assert!(matches!(
            decide(WebhookSource::MercadoPago, &authorized),
            WebhookDecision::Apply(PremiumChange { is_premium: true, .. })
        ));
        assert!(matches!(
            decide(WebhookSource::MercadoPago, &cancelled),
            WebhookDecision::Apply(PremiumChange { is_premium: false, .. })
        ));
        assert!(matches!(
            decide(WebhookSource::MercadoPago, &pending),
            WebhookDecision::Ignored(_)
        ));
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("Stripe".parse::<WebhookSource>().unwrap(), WebhookSource::Stripe);
        assert_eq!("mp".parse::<WebhookSource>().unwrap(), WebhookSource::MercadoPago);
        assert!("paypal".parse::<WebhookSource>().is_err());
    }

    #[tokio::test]
    async fn test_apply_writes_hosted_flag() {
        let store = MemoryHostedStore::new();
        store.register_account("user-1", "ana@example.com").await;

        let payload = json!({
            "type": "invoice.payment_succeeded",
            "data": {"object": {"customer_email": "ana@example.com"}}
        });
        apply_webhook(&store, WebhookSource::Stripe, &payload)
            .await
            .unwrap();

        let sub = store.fetch_subscription("user-1").await.unwrap().unwrap();
        assert!(sub.is_premium);
    }
}
