//! Dashboard statistics and productivity insights

use crate::entity::{balance, Priority, Snapshot, Task, TransactionType};
use chrono::NaiveDate;
use serde::Serialize;

/// Derived numbers shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub overdue_tasks: usize,
    pub high_priority_pending: usize,
    /// Percentage in [0, 100]; 0 with no tasks
    pub completion_rate: f64,
    pub upcoming_events: usize,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

impl DashboardStats {
    pub fn from_snapshot(snapshot: &Snapshot, today: NaiveDate) -> Self {
        let total_tasks = snapshot.tasks.len();
        let completed_tasks = snapshot.tasks.iter().filter(|t| t.completed).count();

        let sum_of = |kind: TransactionType| -> f64 {
            snapshot
                .transactions
                .iter()
                .filter(|t| t.kind == kind)
                .map(|t| t.amount.abs())
                .sum()
        };

        Self {
            total_tasks,
            completed_tasks,
            pending_tasks: total_tasks - completed_tasks,
            overdue_tasks: overdue_count(&snapshot.tasks, today),
            high_priority_pending: high_priority_pending(&snapshot.tasks),
            completion_rate: completion_rate(&snapshot.tasks),
            upcoming_events: snapshot.events.iter().filter(|e| e.is_upcoming(today)).count(),
            income: sum_of(TransactionType::Income),
            expense: sum_of(TransactionType::Expense),
            balance: balance(&snapshot.transactions),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Tarefas: {}/{} concluídas ({:.0}%), {} atrasada(s)\nEventos próximos: {}\nSaldo: R$ {:.2} (receitas R$ {:.2}, despesas R$ {:.2})",
            self.completed_tasks,
            self.total_tasks,
            self.completion_rate,
            self.overdue_tasks,
            self.upcoming_events,
            self.balance,
            self.income,
            self.expense,
        )
    }
}

fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    completed as f64 / tasks.len() as f64 * 100.0
}

fn high_priority_pending(tasks: &[Task]) -> usize {
    tasks
        .iter()
        .filter(|t| !t.completed && t.priority == Priority::High)
        .count()
}

fn overdue_count(tasks: &[Task], today: NaiveDate) -> usize {
    tasks.iter().filter(|t| t.is_overdue(today)).count()
}

/// Short advice derived from the task list
pub fn productivity_insights(tasks: &[Task], today: NaiveDate) -> Vec<String> {
    let mut insights = Vec::new();

    if !tasks.is_empty() {
        let rate = completion_rate(tasks);
        let message = if rate >= 80.0 {
            "🎉 Excelente! Você está completando mais de 80% das suas tarefas!"
        } else if rate >= 50.0 {
            "👍 Bom trabalho! Continue assim para melhorar sua produtividade."
        } else {
            "💡 Dica: Tente dividir tarefas grandes em menores para facilitar a conclusão."
        };
        insights.push(message.to_string());
    }

    if high_priority_pending(tasks) > 3 {
        insights.push(
            "⚠️ Você tem muitas tarefas de alta prioridade pendentes. Foque nelas primeiro!".to_string(),
        );
    }

    let overdue = overdue_count(tasks, today);
    if overdue > 0 {
        insights.push(format!(
            "📅 Você tem {} tarefa(s) atrasada(s). Considere reorganizar suas prioridades.",
            overdue
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RecordId;
    use crate::entity::{Category, Event, Transaction, TransactionCategory};
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn task(completed: bool, priority: Priority, due: Option<NaiveDate>) -> Task {
        let mut task = Task::new("t", Category::Personal, Utc::now());
        task.completed = completed;
        task.priority = priority;
        task.due_date = due;
        task
    }

    #[test]
    fn test_empty_snapshot() {
        let stats = DashboardStats::from_snapshot(&Snapshot::default(), day(14));
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.balance, 0.0);
        assert!(productivity_insights(&[], day(14)).is_empty());
    }

    #[test]
    fn test_stats_counts() {
        let snapshot = Snapshot {
            tasks: vec![
                task(true, Priority::Medium, None),
                task(false, Priority::High, Some(day(10))),
                task(false, Priority::Low, Some(day(20))),
            ],
            events: vec![
                Event {
                    id: RecordId::new(),
                    title: "Ontem".into(),
                    date: day(13),
                    time: None,
                    category: Category::Work,
                    description: None,
                    color: None,
                    created_at: Utc::now(),
                },
                Event {
                    id: RecordId::new(),
                    title: "Hoje".into(),
                    date: day(14),
                    time: None,
                    category: Category::Work,
                    description: None,
                    color: None,
                    created_at: Utc::now(),
                },
            ],
            transactions: vec![
                Transaction {
                    id: RecordId::new(),
                    description: "Salário".into(),
                    amount: 1400.0,
                    kind: TransactionType::Income,
                    category: TransactionCategory::Salary,
                    date: day(5),
                    created_at: Utc::now(),
                },
                Transaction {
                    id: RecordId::new(),
                    description: "Mercado".into(),
                    amount: 400.0,
                    kind: TransactionType::Expense,
                    category: TransactionCategory::Food,
                    date: day(6),
                    created_at: Utc::now(),
                },
            ],
        };

        let stats = DashboardStats::from_snapshot(&snapshot, day(14));
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 2);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.high_priority_pending, 1);
        assert_eq!(stats.upcoming_events, 1);
        assert!((stats.balance - 1000.0).abs() < 1e-9);
        assert!(stats.summary().contains("1/3"));
    }

    #[test]
    fn test_insight_tiers() {
        let done = vec![task(true, Priority::Low, None); 4];
        let insights = productivity_insights(&done, day(14));
        assert_eq!(insights.len(), 1);
        assert!(insights[0].contains("80%"));

        let half = vec![task(true, Priority::Low, None), task(false, Priority::Low, None)];
        assert!(productivity_insights(&half, day(14))[0].contains("Bom trabalho"));

        let none = vec![task(false, Priority::Low, None)];
        assert!(productivity_insights(&none, day(14))[0].contains("Dica"));
    }

    #[test]
    fn test_high_priority_and_overdue_warnings() {
        let mut tasks = vec![task(false, Priority::High, None); 4];
        tasks.push(task(false, Priority::Low, Some(day(1))));
        tasks.push(task(true, Priority::Low, Some(day(1))));

        let insights = productivity_insights(&tasks, day(14));
        assert_eq!(insights.len(), 3);
        assert!(insights[1].contains("alta prioridade"));
        assert!(insights[2].contains("1 tarefa(s) atrasada(s)"));
    }
}
