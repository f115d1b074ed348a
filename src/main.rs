//! Odrna - Entry Point
//!
//! Interactive shell over one user session. Built-in commands read the
//! local collections; any other line goes to the assistant.

use odrna::backup::{Backup, BackupUser};
use odrna::command::ActionEffect;
use odrna::core::config::AppConfig;
use odrna::core::error::Result;
use odrna::core::types::EntityKind;
use odrna::entity::{balance, Collection, Record};
use odrna::insights::{productivity_insights, DashboardStats};
use odrna::session::{Session, Turn};

use chrono::Local;
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Odrna - tasks, calendar and finances with a natural language assistant
#[derive(Parser, Debug)]
#[command(name = "odrna")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the local collections
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Hosted sync user id
    #[arg(long)]
    user_id: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("odrna=info")))
        .init();

    let config = AppConfig::load(args.config.as_deref())?;
    tracing::info!("Odrna starting...");

    let rt = Runtime::new()?;

    // Built inside the runtime so the sync worker can be spawned onto it
    let mut session = rt.block_on(async { Session::from_config(&config, args.data_dir, args.user_id) })?;
    if let Some(report) = rt.block_on(session.start()) {
        tracing::info!(
            "Reconciled with hosted data: tasks {:?}, events {:?}, transactions {:?}",
            report.tasks,
            report.events,
            report.transactions
        );
    }

    println!("\n=== ODRNA ===");
    println!("Tarefas, agenda e finanças com um assistente em linguagem natural");
    println!();
    println!("Commands:");
    println!("  tasks / t                 - List tasks");
    println!("  events / e                - List events");
    println!("  finance / f               - List transactions and balance");
    println!("  stats / s                 - Dashboard statistics");
    println!("  insights / i              - Productivity insights");
    println!("  sync                      - Push all collections to the hosted store");
    println!("  backup export <path>      - Write a backup file");
    println!("  backup import <path>      - Replace all data with a backup file");
    println!("  quit / q                  - Exit");
    println!("  <any text>                - Ask the assistant");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "q" => break,
            "tasks" | "t" => {
                print_collection(&session.store().collection(EntityKind::Task));
                continue;
            }
            "events" | "e" => {
                print_collection(&session.store().collection(EntityKind::Event));
                continue;
            }
            "finance" | "f" => {
                print_collection(&session.store().collection(EntityKind::Transaction));
                let transactions = session.store().get_transactions();
                println!("Saldo: R$ {:.2}", balance(&transactions));
                continue;
            }
            "stats" | "s" => {
                let stats = DashboardStats::from_snapshot(&session.store().snapshot(), Local::now().date_naive());
                println!("{}", stats.summary());
                continue;
            }
            "insights" | "i" => {
                let insights = productivity_insights(&session.store().get_tasks(), Local::now().date_naive());
                if insights.is_empty() {
                    println!("Nenhum insight por enquanto. Crie algumas tarefas!");
                }
                for insight in insights {
                    println!("{}", insight);
                }
                continue;
            }
            "sync" => {
                match rt.block_on(session.sync_now()) {
                    Some(outcomes) => {
                        for (kind, outcome) in outcomes {
                            println!("  {}: {:?}", kind, outcome);
                        }
                    }
                    None => println!("Sync is not configured (set SUPABASE_URL, SUPABASE_ANON_KEY and a user id)"),
                }
                continue;
            }
            _ => {}
        }

        if let Some(rest) = input.strip_prefix("backup ") {
            if let Err(e) = handle_backup(&mut session, rest.trim()) {
                println!("Backup failed: {}", e);
            }
            continue;
        }

        let turn = rt.block_on(session.submit(input));
        print_turn(&turn);
    }

    if let Some(stats) = rt.block_on(session.shutdown()) {
        tracing::info!("Sync worker stopped: {} pushed, {} failed", stats.pushed, stats.failed);
    }
    println!("\nAté logo!");
    Ok(())
}

fn handle_backup(session: &mut Session, args: &str) -> Result<()> {
    let (command, path) = args.split_once(' ').unwrap_or((args, ""));
    let path = path.trim();

    match command {
        "export" => {
            let backup = session.export_backup(BackupUser::default());
            let path = if path.is_empty() {
                PathBuf::from(backup.file_name())
            } else {
                PathBuf::from(path)
            };
            backup.write_file(&path)?;
            println!("✅ Backup exportado para {}: {}", path.display(), backup.counts());
        }
        "import" if !path.is_empty() => {
            let backup = Backup::read_file(Path::new(path))?;
            session.restore_backup(&backup)?;
            println!("✅ Backup restaurado: {}", backup.counts());
        }
        _ => println!("Usage: backup export [path] | backup import <path>"),
    }
    Ok(())
}

fn print_turn(turn: &Turn) {
    println!();
    println!("{}", turn.reply());
    for outcome in &turn.batch.outcomes {
        if let Ok(ActionEffect::Listed(collection)) = &outcome.result {
            print_collection(collection);
        }
    }
    println!();
}

fn print_record(record: &Record) {
    match record {
        Record::Task(t) => {
            let due = t
                .due_date
                .map(|d| format!(" (até {})", d.format("%d/%m/%Y")))
                .unwrap_or_default();
            println!(
                "  [{}] {} - {} / {}{}",
                if t.completed { "x" } else { " " },
                t.title,
                t.category.label(),
                t.priority.tag(),
                due
            );
        }
        Record::Event(e) => {
            let time = e.time.map(|t| format!(" {}", t.format("%H:%M"))).unwrap_or_default();
            println!("  {}{} - {} ({})", e.date.format("%d/%m/%Y"), time, e.title, e.category.label());
        }
        Record::Transaction(t) => {
            println!(
                "  {} {:>+10.2} - {} ({})",
                t.date.format("%d/%m/%Y"),
                t.signed_amount(),
                t.description,
                t.category.label()
            );
        }
    }
}

fn print_collection(collection: &Collection) {
    if collection.is_empty() {
        println!("  (nenhum registro)");
        return;
    }
    let records: Vec<Record> = match collection.clone() {
        Collection::Tasks(v) => v.into_iter().map(Record::Task).collect(),
        Collection::Events(v) => v.into_iter().map(Record::Event).collect(),
        Collection::Transactions(v) => v.into_iter().map(Record::Transaction).collect(),
    };
    for record in &records {
        print_record(record);
    }
}
