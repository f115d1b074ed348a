//! Property tests for the entity store and the balance computation

use chrono::{NaiveDate, TimeZone, Utc};
use odrna::core::types::RecordId;
use odrna::entity::{
    balance, Category, Priority, Task, Transaction, TransactionCategory, TransactionType,
};
use odrna::store::EntityStore;
use proptest::prelude::*;

fn arb_category() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(vec![Priority::Low, Priority::Medium, Priority::High])
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset)
    })
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-zA-Z0-9 çãé]{1,24}",
        any::<bool>(),
        arb_category(),
        arb_priority(),
        prop::option::of(arb_date()),
        prop::option::of("[a-z ]{0,40}"),
        0i64..2_000_000_000,
    )
        .prop_map(|(title, completed, category, priority, due_date, description, secs)| Task {
            id: RecordId::new(),
            title,
            completed,
            category,
            priority,
            due_date,
            description,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        })
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        // whole cents keep the sums exact enough to compare
        0u32..10_000_000,
        any::<bool>(),
        prop::sample::select(vec![
            TransactionCategory::Food,
            TransactionCategory::Transport,
            TransactionCategory::Health,
            TransactionCategory::Leisure,
            TransactionCategory::Salary,
            TransactionCategory::Other,
        ]),
        arb_date(),
    )
        .prop_map(|(cents, income, category, date)| Transaction {
            id: RecordId::new(),
            description: "tx".into(),
            amount: cents as f64 / 100.0,
            kind: if income {
                TransactionType::Income
            } else {
                TransactionType::Expense
            },
            category,
            date,
            created_at: Utc::now(),
        })
}

proptest! {
    #[test]
    fn prop_task_collection_round_trips(tasks in prop::collection::vec(arb_task(), 0..12)) {
        let mut store = EntityStore::in_memory();
        store.save_tasks(&tasks).unwrap();
        prop_assert_eq!(store.get_tasks(), tasks);
    }

    #[test]
    fn prop_file_store_round_trips(transactions in prop::collection::vec(arb_transaction(), 0..12)) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = EntityStore::open(dir.path());
        store.save_transactions(&transactions).unwrap();

        let reopened = EntityStore::open(dir.path());
        prop_assert_eq!(reopened.get_transactions(), transactions);
    }

    #[test]
    fn prop_balance_is_income_minus_expense(
        transactions in prop::collection::vec(arb_transaction(), 0..30),
        seed in any::<u64>(),
    ) {
        let income: f64 = transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Income)
            .map(|t| t.amount)
            .sum();
        let expense: f64 = transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Expense)
            .map(|t| t.amount)
            .sum();
        let expected = income - expense;
        prop_assert!((balance(&transactions) - expected).abs() < 1e-6);

        // any reordering gives the same balance
        let mut shuffled = transactions.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }
        prop_assert!((balance(&shuffled) - balance(&transactions)).abs() < 1e-6);
    }
}
