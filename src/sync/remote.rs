//! Hosted persistence collaborator
//!
//! One row per user holds the three collections as JSON columns plus an
//! update timestamp. A `null` column means the collection was never
//! pushed; an empty array means it was pushed empty.

use crate::core::error::{OdrnaError, Result};
use crate::core::types::EntityKind;
use crate::entity::time_format::parse_calendar_date;
use crate::premium::{PlanName, Subscription};
use ahash::AHashMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// The per-user row of the hosted store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDataRow {
    pub user_id: String,
    #[serde(default)]
    pub tasks: Option<Value>,
    #[serde(default)]
    pub events: Option<Value>,
    #[serde(default)]
    pub transactions: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserDataRow {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Stored column for a collection, `None` when never pushed
    pub fn column(&self, kind: EntityKind) -> Option<&Value> {
        let column = match kind {
            EntityKind::Task => &self.tasks,
            EntityKind::Event => &self.events,
            EntityKind::Transaction => &self.transactions,
        };
        column.as_ref().filter(|v| !v.is_null())
    }

    fn set_column(&mut self, kind: EntityKind, records: Value) {
        let column = match kind {
            EntityKind::Task => &mut self.tasks,
            EntityKind::Event => &mut self.events,
            EntityKind::Transaction => &mut self.transactions,
        };
        *column = Some(records);
    }
}

/// Read/write access to the hosted store, keyed by user identity
#[async_trait]
pub trait HostedStore: Send + Sync {
    /// Fetch the row for a user, `None` when the user has no row yet
    async fn fetch_row(&self, user_id: &str) -> Result<Option<UserDataRow>>;

    /// Replace one collection of the user's row, creating the row if needed
    async fn upsert_collection(&self, user_id: &str, kind: EntityKind, records: Value)
        -> Result<()>;

    /// Trusted account-status read
    async fn fetch_subscription(&self, user_id: &str) -> Result<Option<Subscription>>;

    /// Write the premium flag for the account with `email`; returns whether one matched
    async fn set_premium_by_email(&self, email: &str, subscription: &Subscription) -> Result<bool>;
}

// =========================================================================
//  REST implementation (PostgREST-style API)
// =========================================================================

/// Hosted store reached over a PostgREST-style HTTP API
pub struct RestHostedStore {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct AccountRow {
    #[serde(default)]
    is_premium: bool,
    #[serde(default)]
    plan_name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    renewal_date: Option<String>,
}

impl From<AccountRow> for Subscription {
    fn from(row: AccountRow) -> Self {
        let plan_name = match row.plan_name.as_deref() {
            Some("premium") => PlanName::Premium,
            Some(_) => PlanName::Free,
            None if row.is_premium => PlanName::Premium,
            None => PlanName::Free,
        };
        Subscription {
            is_premium: row.is_premium,
            plan_name,
            price: row.price,
            renewal_date: row
                .renewal_date
                .as_deref()
                .and_then(parse_calendar_date)
                .map(|(date, _)| date),
        }
    }
}

impl RestHostedStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, name)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table(table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(OdrnaError::Sync(format!("HTTP {}: {}", status.as_u16(), body)))
    }
}

#[async_trait]
impl HostedStore for RestHostedStore {
    async fn fetch_row(&self, user_id: &str) -> Result<Option<UserDataRow>> {
        let response = self
            .request(Method::GET, "user_data")
            .query(&[("user_id", format!("eq.{}", user_id)), ("select", "*".into())])
            .send()
            .await?;
        let rows: Vec<UserDataRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_collection(
        &self,
        user_id: &str,
        kind: EntityKind,
        records: Value,
    ) -> Result<()> {
        let mut body = serde_json::Map::new();
        body.insert("user_id".into(), json!(user_id));
        body.insert(kind.collection().into(), records);
        body.insert("updated_at".into(), json!(Utc::now()));

        let response = self
            .request(Method::POST, "user_data")
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&Value::Object(body))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_subscription(&self, user_id: &str) -> Result<Option<Subscription>> {
        let response = self
            .request(Method::GET, "users")
            .query(&[
                ("id", format!("eq.{}", user_id)),
                ("select", "is_premium,plan_name,price,renewal_date".into()),
            ])
            .send()
            .await?;
        let rows: Vec<AccountRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().next().map(Subscription::from))
    }

    async fn set_premium_by_email(&self, email: &str, subscription: &Subscription) -> Result<bool> {
        let response = self
            .request(Method::PATCH, "users")
            .query(&[("email", format!("eq.{}", email))])
            .header("Prefer", "return=representation")
            .json(&json!({
                "is_premium": subscription.is_premium,
                "plan_name": subscription.plan_name,
                "updated_at": Utc::now(),
            }))
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;
        Ok(!rows.is_empty())
    }
}

// =========================================================================
//  In-process implementation
// =========================================================================

#[derive(Debug, Clone)]
struct Account {
    email: String,
    subscription: Subscription,
}

/// Hosted store kept in memory, shared by every session holding it
#[derive(Debug, Default)]
pub struct MemoryHostedStore {
    rows: RwLock<AHashMap<String, UserDataRow>>,
    accounts: RwLock<AHashMap<String, Account>>,
    offline: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryHostedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the service were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful collection upserts so far
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub async fn register_account(&self, user_id: &str, email: &str) {
        self.accounts.write().await.insert(
            user_id.to_string(),
            Account {
                email: email.to_string(),
                subscription: Subscription::free(),
            },
        );
    }

    pub async fn row(&self, user_id: &str) -> Option<UserDataRow> {
        self.rows.read().await.get(user_id).cloned()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(OdrnaError::Sync("hosted store unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl HostedStore for MemoryHostedStore {
    async fn fetch_row(&self, user_id: &str) -> Result<Option<UserDataRow>> {
        self.ensure_online()?;
        Ok(self.rows.read().await.get(user_id).cloned())
    }

    async fn upsert_collection(
        &self,
        user_id: &str,
        kind: EntityKind,
        records: Value,
    ) -> Result<()> {
        self.ensure_online()?;
        let mut rows = self.rows.write().await;
        let row = rows
            .entry(user_id.to_string())
            .or_insert_with(|| UserDataRow::new(user_id));
        row.set_column(kind, records);
        row.updated_at = Some(Utc::now());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_subscription(&self, user_id: &str) -> Result<Option<Subscription>> {
        self.ensure_online()?;
        Ok(self
            .accounts
            .read()
            .await
            .get(user_id)
            .map(|a| a.subscription.clone()))
    }

    async fn set_premium_by_email(&self, email: &str, subscription: &Subscription) -> Result<bool> {
        self.ensure_online()?;
        let mut accounts = self.accounts.write().await;
        let mut matched = false;
        for account in accounts.values_mut().filter(|a| a.email == email) {
            account.subscription = subscription.clone();
            matched = true;
        }
        Ok(matched)
    }
}
