//! Intent resolution - utterance + snapshot -> ordered actions and a reply
//!
//! The resolver never fails. Missing credentials, upstream errors, timeouts
//! and unusable model output all come back as an empty action list with a
//! user-facing explanation. It never touches the entity store.

use crate::command::heuristics::{
    extract_clock_time, find_money, infer_category, infer_transaction_category,
    infer_transaction_type, parse_money, resolve_relative_date,
};
use crate::core::error::OdrnaError;
use crate::entity::time_format::{parse_calendar_date, parse_clock_time};
use crate::entity::{Category, Snapshot, TransactionCategory, TransactionType};
use crate::llm::{request_reply, AssistantContext, CompletionService, RawAction};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Why the resolver answered without consulting the model's actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    EmptyInput,
    NotConfigured,
    Unauthorized,
    TimedOut,
    Upstream,
    Malformed,
    /// Assistant restricted to premium subscriptions
    PremiumRequired,
}

impl Fallback {
    pub fn message(&self) -> &'static str {
        match self {
            Fallback::EmptyInput => "Digite um comando, por exemplo: \"crie uma tarefa de estudar inglês\".",
            Fallback::NotConfigured => {
                "⚠️ O assistente não está configurado. Defina a chave da API (LLM_API_KEY) na configuração para usar comandos em linguagem natural."
            }
            Fallback::Unauthorized => {
                "🔑 A chave da API do assistente está incorreta ou inválida. Verifique a configuração (LLM_API_KEY)."
            }
            Fallback::TimedOut => "⏱️ O assistente demorou demais para responder. Tente novamente em alguns instantes.",
            Fallback::Upstream => {
                "😔 Ops! Tive um problema ao falar com o assistente. Verifique sua conexão e tente novamente."
            }
            Fallback::Malformed => "❌ Desculpe, não consegui entender completamente. Pode reformular de outra forma?",
            Fallback::PremiumRequired => "✨ O assistente está disponível no plano Premium.",
        }
    }

    fn from_error(error: &OdrnaError) -> Self {
        match error {
            OdrnaError::LlmNotConfigured(_) | OdrnaError::Config(_) => Fallback::NotConfigured,
            OdrnaError::LlmUnauthorized { .. } => Fallback::Unauthorized,
            OdrnaError::Timeout(_) => Fallback::TimedOut,
            OdrnaError::LlmMalformed(_) | OdrnaError::SerdeError(_) => Fallback::Malformed,
            _ => Fallback::Upstream,
        }
    }
}

/// Actions to execute, in order, plus the reply for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub actions: Vec<RawAction>,
    pub response: String,
    /// Set when the reply is a fallback explanation
    pub fallback: Option<Fallback>,
}

impl Resolution {
    pub fn fallback(reason: Fallback) -> Self {
        Self {
            actions: Vec::new(),
            response: reason.message().to_string(),
            fallback: Some(reason),
        }
    }
}

/// Resolves free text into actions through a completion service
pub struct IntentResolver {
    service: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl IntentResolver {
    pub fn new(service: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Resolve against the current local time
    pub async fn resolve(&self, input: &str, snapshot: &Snapshot) -> Resolution {
        self.resolve_at(input, snapshot, Local::now().naive_local()).await
    }

    /// Resolve with an explicit reference moment for relative dates
    pub async fn resolve_at(&self, input: &str, snapshot: &Snapshot, now: NaiveDateTime) -> Resolution {
        let input = input.trim();
        if input.is_empty() {
            return Resolution::fallback(Fallback::EmptyInput);
        }
        if !self.service.is_configured() {
            tracing::warn!("Assistant called without an API key");
            return Resolution::fallback(Fallback::NotConfigured);
        }

        let context = AssistantContext::new(snapshot, now);
        let reply = match tokio::time::timeout(
            self.timeout,
            request_reply(self.service.as_ref(), input, &context),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let reason = Fallback::from_error(&e);
                tracing::warn!("Assistant request failed ({:?}): {}", reason, e);
                return Resolution::fallback(reason);
            }
            Err(_) => {
                tracing::warn!("Assistant request timed out after {:?}", self.timeout);
                return Resolution::fallback(Fallback::TimedOut);
            }
        };

        let single = reply.actions.len() == 1;
        let actions: Vec<RawAction> = reply
            .actions
            .into_iter()
            .map(|action| complete_action(action, input, single, now.date()))
            .collect();

        let response = if reply.response.trim().is_empty() {
            default_response(actions.len())
        } else {
            reply.response
        };

        tracing::info!("Resolved '{}' into {} action(s)", input, actions.len());
        Resolution {
            actions,
            response,
            fallback: None,
        }
    }
}

fn default_response(actions: usize) -> String {
    match actions {
        0 => "Certo! Como posso ajudar?".into(),
        1 => "Pronto! ✅".into(),
        n => format!("Pronto! {} ações processadas. ✅", n),
    }
}

/// Fill in what the model left out or wrote loosely
///
/// The utterance is only consulted when the batch has a single action;
/// with several actions it cannot be attributed to one of them.
fn complete_action(mut action: RawAction, utterance: &str, single: bool, today: NaiveDate) -> RawAction {
    let Value::Object(data) = &mut action.data else {
        return action;
    };
    let utterance = single.then_some(utterance);

    match (normalize_tag(&action.kind).as_str(), normalize_tag(&action.action).as_str()) {
        ("task", "create") => complete_task(data, utterance, today),
        ("event", "create") => complete_event(data, utterance, today),
        ("transaction", "create") => complete_transaction(data, utterance, today),
        (_, "update") => {
            if let Some(Value::Object(updates)) = data.get_mut("updates") {
                absolutize_dates(updates, today);
            } else {
                absolutize_dates(data, today);
            }
        }
        _ => {}
    }
    action
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

fn text_field<'a>(data: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    data.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Rewrite relative date fields ("amanhã") to `YYYY-MM-DD`
fn absolutize_dates(data: &mut Map<String, Value>, today: NaiveDate) {
    for name in ["date", "dueDate", "due_date"] {
        let Some(raw) = text_field(data, name).map(str::to_string) else {
            continue;
        };
        if parse_calendar_date(&raw).is_some() {
            continue;
        }
        if let Some(date) = resolve_relative_date(&raw, today) {
            data.insert(name.into(), json!(date.format("%Y-%m-%d").to_string()));
        }
    }
}

fn infer_category_into(data: &mut Map<String, Value>, title_field: &str, utterance: Option<&str>) {
    let stated = text_field(data, "category").and_then(Category::parse);
    if stated.is_some() {
        return;
    }
    let inferred = text_field(data, title_field)
        .and_then(infer_category)
        .or_else(|| utterance.and_then(infer_category));
    if let Some(category) = inferred {
        data.insert("category".into(), json!(category.tag()));
    }
}

fn complete_task(data: &mut Map<String, Value>, utterance: Option<&str>, today: NaiveDate) {
    infer_category_into(data, "title", utterance);
    absolutize_dates(data, today);

    let has_due = text_field(data, "dueDate").is_some() || text_field(data, "due_date").is_some();
    if !has_due {
        if let Some(date) = utterance.and_then(|u| resolve_relative_date(u, today)) {
            data.insert("dueDate".into(), json!(date.format("%Y-%m-%d").to_string()));
        }
    }
}

fn complete_event(data: &mut Map<String, Value>, utterance: Option<&str>, today: NaiveDate) {
    infer_category_into(data, "title", utterance);
    absolutize_dates(data, today);

    let title = text_field(data, "title").map(str::to_string);
    let sources = || title.iter().map(String::as_str).chain(utterance);

    let date = text_field(data, "date").and_then(parse_calendar_date);
    if date.is_none() {
        let resolved = sources()
            .find_map(|s| resolve_relative_date(s, today))
            .unwrap_or(today);
        data.insert("date".into(), json!(resolved.format("%Y-%m-%d").to_string()));
    }

    match text_field(data, "time").map(str::to_string) {
        Some(time) => {
            if let Some(parsed) = parse_clock_time(&time).or_else(|| extract_clock_time(&time)) {
                data.insert("time".into(), json!(parsed.format("%H:%M").to_string()));
            }
        }
        None => {
            let in_date = date.and_then(|(_, t)| t);
            if in_date.is_none() {
                if let Some(time) = sources().find_map(extract_clock_time) {
                    data.insert("time".into(), json!(time.format("%H:%M").to_string()));
                }
            }
        }
    }
}

fn complete_transaction(data: &mut Map<String, Value>, utterance: Option<&str>, today: NaiveDate) {
    absolutize_dates(data, today);

    let description = text_field(data, "description").map(str::to_string);
    let sources: Vec<&str> = description.iter().map(String::as_str).chain(utterance).collect();

    // a signed amount carries the direction when the type is missing
    let mut negative = false;
    let amount = match data.get("amount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_money(s),
        _ => sources.iter().find_map(|s| find_money(s)),
    };
    if let Some(amount) = amount {
        negative = amount < 0.0;
        data.insert("amount".into(), json!(amount.abs()));
    }

    let category = text_field(data, "category")
        .and_then(TransactionCategory::parse)
        .or_else(|| sources.iter().find_map(|s| infer_transaction_category(s)));

    let stated_type = text_field(data, "type").map(str::to_string);
    let kind = match stated_type.as_deref() {
        Some(stated) => TransactionType::parse(stated),
        None => Some(if negative {
            TransactionType::Expense
        } else if category == Some(TransactionCategory::Salary) {
            TransactionType::Income
        } else {
            sources
                .iter()
                .find_map(|s| infer_transaction_type(s))
                .unwrap_or(TransactionType::Expense)
        }),
    };
    // an unrecognized stated type is left for validation to reject
    if let Some(kind) = kind {
        data.insert("type".into(), json!(kind.tag()));
    }

    if let Some(category) = category {
        data.insert("category".into(), json!(category.tag()));
    }
}
