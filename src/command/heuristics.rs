//! Keyword and pattern heuristics used to complete resolved actions
//!
//! Everything here is best effort. A miss returns `None` and the caller
//! keeps whatever the model said, or the field default.

use crate::entity::category::normalize;
use crate::entity::{Category, TransactionCategory, TransactionType};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use regex::Regex;
use std::sync::OnceLock;

const STUDY_WORDS: &[&str] = &[
    "estud", "aula", "curso", "prova", "ingles", "idioma", "livro", "leitura", "faculdade",
    "escola", "licao", "study", "class", "course", "homework",
];
const HEALTH_WORDS: &[&str] = &[
    "exercic", "academia", "treino", "treinar", "medic", "consulta", "dentista", "corrida",
    "correr", "caminhada", "yoga", "pilates", "saude", "remedio", "exame", "gym", "doctor",
    "workout", "running",
];
const WORK_WORDS: &[&str] = &[
    "trabalho", "reuniao", "cliente", "projeto", "relatorio", "chefe", "escritorio",
    "apresentacao", "entrega", "work", "meeting", "office", "report", "client",
];

const SALARY_WORDS: &[&str] = &["salari", "holerite", "freela", "salary", "paycheck"];
const FOOD_WORDS: &[&str] = &[
    "mercado", "supermercado", "restaurante", "almoco", "jantar", "comida", "lanche",
    "padaria", "ifood", "pizza", "cafe", "acougue", "food", "grocer", "lunch",
    "dinner",
];
const TRANSPORT_WORDS: &[&str] = &[
    "uber", "onibus", "gasolina", "combustivel", "taxi", "metro", "estacionamento",
    "passagem", "pedagio", "transport", "fuel", "parking", "bus",
];
const HEALTH_SPEND_WORDS: &[&str] = &[
    "farmacia", "remedio", "medic", "consulta", "dentista", "academia", "hospital",
    "pharmacy",
];
const LEISURE_WORDS: &[&str] = &[
    "cinema", "show", "viagem", "bar", "netflix", "spotify", "jogo", "festa", "lazer",
    "passeio", "ingresso", "movie", "concert", "trip",
];

const INCOME_WORDS: &[&str] = &[
    "salari", "recebi", "ganhei", "caiu", "receita", "entrada", "vendi", "renda",
    "reembolso", "income", "earned", "received", "got paid",
];
const EXPENSE_WORDS: &[&str] = &[
    "gastei", "paguei", "comprei", "despesa", "gasto", "conta", "compra", "boleto",
    "spent", "paid", "bought", "expense",
];

/// Words of a normalized text
fn words(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether any word starts with one of `keywords`; multi-word keywords
/// match against the whole normalized text
fn mentions(text: &str, keywords: &[&str]) -> bool {
    let normalized = normalize(text);
    let words = words(text);
    keywords.iter().any(|k| {
        if k.contains(' ') {
            normalized.contains(k)
        } else {
            words.iter().any(|w| w.starts_with(k))
        }
    })
}

/// Category of a task or event from its wording
pub fn infer_category(text: &str) -> Option<Category> {
    if mentions(text, STUDY_WORDS) {
        Some(Category::Study)
    } else if mentions(text, HEALTH_WORDS) {
        Some(Category::Health)
    } else if mentions(text, WORK_WORDS) {
        Some(Category::Work)
    } else {
        None
    }
}

pub fn infer_transaction_category(text: &str) -> Option<TransactionCategory> {
    [
        (SALARY_WORDS, TransactionCategory::Salary),
        (FOOD_WORDS, TransactionCategory::Food),
        (TRANSPORT_WORDS, TransactionCategory::Transport),
        (HEALTH_SPEND_WORDS, TransactionCategory::Health),
        (LEISURE_WORDS, TransactionCategory::Leisure),
    ]
    .into_iter()
    .find(|(keywords, _)| mentions(text, keywords))
    .map(|(_, category)| category)
}

pub fn infer_transaction_type(text: &str) -> Option<TransactionType> {
    if mentions(text, INCOME_WORDS) {
        Some(TransactionType::Income)
    } else if mentions(text, EXPENSE_WORDS) {
        Some(TransactionType::Expense)
    } else {
        None
    }
}

// =========================================================================
//  Dates and times
// =========================================================================

fn weekday_from_word(word: &str) -> Option<Weekday> {
    match word {
        "segunda" | "monday" => Some(Weekday::Mon),
        "terca" | "tuesday" => Some(Weekday::Tue),
        "quarta" | "wednesday" => Some(Weekday::Wed),
        "quinta" | "thursday" => Some(Weekday::Thu),
        "sexta" | "friday" => Some(Weekday::Fri),
        "sabado" | "saturday" => Some(Weekday::Sat),
        "domingo" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Portuguese weekday words double as ordinals ("segunda tarefa"), so
/// they only count next to a word that makes them a day
fn is_weekday_context(prev: Option<&str>, next: Option<&str>) -> bool {
    const BEFORE: &[&str] = &[
        "na", "no", "proxima", "proximo", "nesta", "neste", "esta", "este", "essa", "ate",
        "next", "on", "this",
    ];
    next == Some("feira") || prev.map(|p| BEFORE.contains(&p)).unwrap_or(false)
}

/// First day strictly after `today` falling on `weekday`
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    today + Duration::days(if ahead == 0 { 7 } else { ahead })
}

fn explicit_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").expect("valid date regex")
    })
}

fn in_days_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:em|daqui a|in)\s+(\d{1,3})\s+(?:dias?|days?)\b").expect("valid days regex"))
}

/// Resolve a date mentioned in free text against `today`
///
/// Understands today/tomorrow/yesterday, "depois de amanhã", weekday names,
/// "next week", "in N days" and `DD/MM[/YYYY]`, in Portuguese and English.
pub fn resolve_relative_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let normalized = normalize(text);

    if let Some(caps) = explicit_date_regex().captures(&normalized) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = match caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok()) {
            Some(y) if y < 100 => 2000 + y,
            Some(y) => y,
            None => today.year(),
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = in_days_regex().captures(&normalized) {
        let days: i64 = caps[1].parse().ok()?;
        return Some(today + Duration::days(days));
    }

    if normalized.contains("depois de amanha") || normalized.contains("day after tomorrow") {
        return Some(today + Duration::days(2));
    }

    let words = words(&normalized);
    for (i, word) in words.iter().enumerate() {
        let offset = match word.as_str() {
            "hoje" | "today" | "tonight" => Some(0),
            "amanha" | "tomorrow" => Some(1),
            "ontem" | "yesterday" => Some(-1),
            _ => None,
        };
        if let Some(days) = offset {
            return Some(today + Duration::days(days));
        }

        if let Some(weekday) = weekday_from_word(word) {
            let english = word.ends_with("day");
            let prev = i.checked_sub(1).map(|p| words[p].as_str());
            let next = words.get(i + 1).map(String::as_str);
            if english || is_weekday_context(prev, next) {
                return Some(next_weekday(today, weekday));
            }
        }
    }

    if normalized.contains("proxima semana")
        || normalized.contains("semana que vem")
        || normalized.contains("next week")
    {
        return Some(today + Duration::days(7));
    }

    None
}

fn clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})(?::(\d{2})|\s*h(?:rs?|oras?)?(\d{2})?\b)").expect("valid clock regex")
    })
}

fn period_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})\s*(?:h|horas?)?\s+da\s+(manha|tarde|noite)\b").expect("valid period regex")
    })
}

/// Clock time mentioned in free text: `14:30`, `18h`, `18hrs`, `9h15`,
/// `6 da tarde`
pub fn extract_clock_time(text: &str) -> Option<NaiveTime> {
    let normalized = normalize(text);

    if let Some(caps) = period_regex().captures(&normalized) {
        let hour: u32 = caps[1].parse().ok()?;
        let hour = match &caps[2] {
            "tarde" | "noite" if hour < 12 => hour + 12,
            _ => hour,
        };
        return NaiveTime::from_hms_opt(hour, 0, 0);
    }

    let caps = clock_regex().captures(&normalized)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().parse().unwrap_or(0))
        .unwrap_or(0);
    NaiveTime::from_hms_opt(hour, minute, 0)
}

// =========================================================================
//  Money
// =========================================================================

/// Parse an amount written as a string: `1400`, `R$ 1.400,00`, `1,400.50`,
/// `-30`. The sign is kept; callers decide what it means.
pub fn parse_money(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches("R$")
        .trim_start_matches('$')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start_matches("R$")),
        None => (false, cleaned.as_str()),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let canonical = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) => {
            // whichever separator comes last is the decimal point
            let (decimal, thousands) = if comma > dot { (',', '.') } else { ('.', ',') };
            digits.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => single_separator(digits, '.'),
        (None, Some(_)) => single_separator(digits, ','),
        (None, None) => digits.to_string(),
    };

    let value: f64 = canonical.parse().ok()?;
    value.is_finite().then_some(if negative { -value } else { value })
}

/// `1.400` and `1.400.000` are thousands; `1.5` and `12,90` are decimals
fn single_separator(digits: &str, sep: char) -> String {
    let groups: Vec<&str> = digits.split(sep).collect();
    let thousands = groups.len() > 2 || groups.last().map(|g| g.len() == 3).unwrap_or(false);
    if thousands {
        groups.concat()
    } else {
        digits.replace(sep, ".")
    }
}

fn money_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:R\$\s*)?-?\d[\d.,]*").expect("valid money regex"))
}

/// First amount mentioned in free text, preferring one marked with `R$`
pub fn find_money(text: &str) -> Option<f64> {
    let matches: Vec<&str> = money_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(|c| c == '.' || c == ','))
        .collect();
    matches
        .iter()
        .find(|m| m.starts_with("R$"))
        .or_else(|| matches.first())
        .and_then(|m| parse_money(m))
}
