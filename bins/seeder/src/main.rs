//! Demo data seeder for the costs ledger.
//!
//! Migrates the configured database, records a month of activity for a demo
//! user through the ledger engine, and prints the resulting summaries.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use costs_core::ledger::{
    Account, AccountInput, AccountType, LedgerEngine, LedgerPolicy, TransactionInput,
};
use costs_db::migration::{Migrator, MigratorTrait};
use costs_db::{SqlLedgerStore, connect};
use costs_shared::AppConfig;
use costs_shared::types::UserId;

/// Demo user ID (consistent for all seeds)
const DEMO_USER_ID: &str = "00000000-0000-0000-0000-000000000002";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("Connecting to database...");
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    println!("Running migrations...");
    Migrator::up(&db, None).await?;

    let engine = LedgerEngine::with_policy(
        SqlLedgerStore::new(db),
        LedgerPolicy::from(&config.ledger),
    );
    let user = UserId::from_uuid(Uuid::parse_str(DEMO_USER_ID)?);

    if engine.accounts_for_user(user).await?.is_empty() {
        println!("Seeding demo ledger...");
        seed_demo_ledger(&engine, user).await?;
    } else {
        println!("  Demo accounts already exist, skipping...");
    }

    print_summaries(&engine, user).await?;

    println!("Seeding complete!");
    Ok(())
}

async fn create_account(
    engine: &LedgerEngine<SqlLedgerStore>,
    user: UserId,
    name: &str,
    account_type: AccountType,
    balance: Decimal,
) -> anyhow::Result<Account> {
    let account = engine
        .create_account(
            user,
            &AccountInput {
                name: name.to_string(),
                account_type: Some(account_type.to_string()),
                description: format!("Demo {account_type} account"),
                balance,
            },
        )
        .await?;
    println!("  Created {name} ({account_type})");
    Ok(account)
}

/// Seeds accounts of every type and a month of transactions between them.
async fn seed_demo_ledger(
    engine: &LedgerEngine<SqlLedgerStore>,
    user: UserId,
) -> anyhow::Result<()> {
    use AccountType::{Current, Debt, ExpenseCategory, IncomeSource, Saving};

    let salary = create_account(engine, user, "Salary", IncomeSource, Decimal::ZERO).await?;
    let checking = create_account(engine, user, "Checking", Current, Decimal::new(500, 0)).await?;
    let savings = create_account(engine, user, "Savings", Saving, Decimal::new(2000, 0)).await?;
    let card = create_account(engine, user, "Credit card", Debt, Decimal::ZERO).await?;
    let rent = create_account(engine, user, "Rent", ExpenseCategory, Decimal::ZERO).await?;
    let groceries =
        create_account(engine, user, "Groceries", ExpenseCategory, Decimal::ZERO).await?;

    let now = Utc::now();
    let seeds = [
        ("Income", &salary, &checking, Decimal::new(3200, 0), 28, "Monthly salary"),
        ("Expense", &checking, &rent, Decimal::new(1200, 0), 27, "Rent"),
        ("Expense", &checking, &groceries, Decimal::new(8540, 2), 20, "Weekly shop"),
        ("Standard", &checking, &savings, Decimal::new(400, 0), 15, "Savings transfer"),
        ("Standard", &checking, &card, Decimal::new(150, 0), 10, "Card repayment"),
        ("Expense", &checking, &groceries, Decimal::new(6215, 2), 6, "Weekly shop"),
    ];

    for (kind, source, destination, amount, days_ago, description) in seeds {
        let tx = engine
            .create_transaction(
                user,
                &TransactionInput {
                    kind: Some(kind.to_string()),
                    source: Some(source.id),
                    destination: Some(destination.id),
                    amount: Some(amount),
                    transaction_date: Some(now - Duration::days(days_ago)),
                    description: description.to_string(),
                },
            )
            .await?;
        info!(transaction_id = %tx.id, kind = %tx.kind, "Seeded transaction");
    }

    println!("  Seeded {} transactions", seeds.len());
    Ok(())
}

/// Prints per-account and user summaries for the last 30 days.
async fn print_summaries(
    engine: &LedgerEngine<SqlLedgerStore>,
    user: UserId,
) -> anyhow::Result<()> {
    let end = Utc::now();
    let start = end - Duration::days(30);

    println!("Summaries for the last 30 days:");
    for account in engine.accounts_for_user(user).await? {
        let summary = engine
            .summary_for_account(user, account.id, start, end)
            .await?;
        println!(
            "  {:<12} {:<16} balance {:>10}  income {:>10}  expense {:>10}",
            account.name,
            account.account_type.as_str(),
            account.balance,
            summary.income(),
            summary.expense()
        );
    }

    let total = engine.summary_for_user(user, start, end).await?;
    println!(
        "  Total income {}, expense {}, net {}",
        total.income,
        total.expense,
        total.net()
    );
    Ok(())
}
