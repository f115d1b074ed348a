//! Finance transactions
//!
//! `amount` is always a non-negative magnitude. Direction comes from
//! `type` alone, so the balance is income minus expense.

use crate::core::types::RecordId;
use crate::entity::category::{TransactionCategory, TransactionType};
use crate::entity::time_format::calendar_date;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: RecordId,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub category: TransactionCategory,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with the sign implied by the transaction type
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount.abs(),
            TransactionType::Expense => -self.amount.abs(),
        }
    }
}

/// Sum of income amounts minus sum of expense amounts
pub fn balance(transactions: &[Transaction]) -> f64 {
    let income: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionType::Income)
        .map(|t| t.amount.abs())
        .sum();
    let expense: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionType::Expense)
        .map(|t| t.amount.abs())
        .sum();
    income - expense
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: f64, kind: TransactionType) -> Transaction {
        Transaction {
            id: RecordId::new(),
            description: "test".into(),
            amount,
            kind,
            category: TransactionCategory::Other,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_balance() {
        let txs = vec![
            tx(1400.0, TransactionType::Income),
            tx(50.0, TransactionType::Expense),
            tx(25.5, TransactionType::Expense),
        ];
        assert!((balance(&txs) - 1324.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_balance_is_zero() {
        assert_eq!(balance(&[]), 0.0);
    }

    #[test]
    fn test_signed_amount_follows_type() {
        assert_eq!(tx(50.0, TransactionType::Expense).signed_amount(), -50.0);
        assert_eq!(tx(50.0, TransactionType::Income).signed_amount(), 50.0);
    }

    #[test]
    fn test_type_field_name() {
        let value = serde_json::to_value(tx(10.0, TransactionType::Income)).unwrap();
        assert_eq!(value["type"], "income");
        assert_eq!(value["category"], "outros");
    }
}
