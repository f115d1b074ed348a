//! Enumerated fields shared by the record types
//!
//! Wire values are the Portuguese tags the stored data has always used.
//! Parsing also accepts English names and accented spellings. Categories
//! are a best-effort classification, so stored values that do not parse
//! fall back to a default instead of failing the whole collection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowercase, trim and strip the diacritics common in Portuguese input
pub fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Category of tasks and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Category {
    #[serde(rename = "trabalho")]
    Work,
    #[serde(rename = "estudos")]
    Study,
    #[serde(rename = "saude")]
    Health,
    #[default]
    #[serde(rename = "pessoal")]
    Personal,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Work,
        Category::Study,
        Category::Health,
        Category::Personal,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "trabalho" | "work" => Some(Category::Work),
            "estudos" | "estudo" | "study" | "studies" => Some(Category::Study),
            "saude" | "health" => Some(Category::Health),
            "pessoal" | "personal" => Some(Category::Personal),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Category::Work => "trabalho",
            Category::Study => "estudos",
            Category::Health => "saude",
            Category::Personal => "pessoal",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Work => "Trabalho",
            Category::Study => "Estudos",
            Category::Health => "Saúde",
            Category::Personal => "Pessoal",
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::parse(&s).unwrap_or_else(|| {
            tracing::warn!("Unknown category '{}', using default", s);
            Category::default()
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Priority {
    #[serde(rename = "low")]
    Low,
    #[default]
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "low" | "baixa" => Some(Priority::Low),
            "medium" | "media" | "normal" => Some(Priority::Medium),
            "high" | "alta" | "urgente" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::parse(&s).unwrap_or_default()
    }
}

/// Direction of a transaction; the amount itself is always a magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn parse(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "income" | "receita" | "entrada" => Some(TransactionType::Income),
            "expense" | "despesa" | "saida" | "gasto" => Some(TransactionType::Expense),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

/// Category of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum TransactionCategory {
    #[serde(rename = "alimentacao")]
    Food,
    #[serde(rename = "transporte")]
    Transport,
    #[serde(rename = "saude")]
    Health,
    #[serde(rename = "lazer")]
    Leisure,
    #[serde(rename = "salario")]
    Salary,
    #[default]
    #[serde(rename = "outros")]
    Other,
}

impl TransactionCategory {
    pub const ALL: [TransactionCategory; 6] = [
        TransactionCategory::Food,
        TransactionCategory::Transport,
        TransactionCategory::Health,
        TransactionCategory::Leisure,
        TransactionCategory::Salary,
        TransactionCategory::Other,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "alimentacao" | "food" => Some(TransactionCategory::Food),
            "transporte" | "transport" => Some(TransactionCategory::Transport),
            "saude" | "health" => Some(TransactionCategory::Health),
            "lazer" | "leisure" => Some(TransactionCategory::Leisure),
            "salario" | "salary" => Some(TransactionCategory::Salary),
            "outros" | "outro" | "other" => Some(TransactionCategory::Other),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            TransactionCategory::Food => "alimentacao",
            TransactionCategory::Transport => "transporte",
            TransactionCategory::Health => "saude",
            TransactionCategory::Leisure => "lazer",
            TransactionCategory::Salary => "salario",
            TransactionCategory::Other => "outros",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionCategory::Food => "Alimentação",
            TransactionCategory::Transport => "Transporte",
            TransactionCategory::Health => "Saúde",
            TransactionCategory::Leisure => "Lazer",
            TransactionCategory::Salary => "Salário",
            TransactionCategory::Other => "Outros",
        }
    }
}

impl From<String> for TransactionCategory {
    fn from(s: String) -> Self {
        TransactionCategory::parse(&s).unwrap_or_else(|| {
            tracing::warn!("Unknown transaction category '{}', using default", s);
            TransactionCategory::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents() {
        assert_eq!(normalize("  Saúde "), "saude");
        assert_eq!(normalize("Alimentação"), "alimentacao");
    }

    #[test]
    fn test_category_wire_values() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.tag()));
        }
    }

    #[test]
    fn test_category_accepts_aliases() {
        assert_eq!(Category::parse("Saúde"), Some(Category::Health));
        assert_eq!(Category::parse("study"), Some(Category::Study));
        assert_eq!(Category::parse("hobby"), None);
    }

    #[test]
    fn test_unknown_stored_category_coerces_to_default() {
        let category: Category = serde_json::from_str("\"hobby\"").unwrap();
        assert_eq!(category, Category::Personal);

        let category: TransactionCategory = serde_json::from_str("\"mercado\"").unwrap();
        assert_eq!(category, TransactionCategory::Other);
    }

    #[test]
    fn test_transaction_type_is_strict() {
        assert!(serde_json::from_str::<TransactionType>("\"refund\"").is_err());
        assert_eq!(TransactionType::parse("Receita"), Some(TransactionType::Income));
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let priority: Priority = serde_json::from_str("\"whenever\"").unwrap();
        assert_eq!(priority, Priority::Medium);
        assert_eq!(Priority::parse("alta"), Some(Priority::High));
    }
}
