//! Transaction command implementations

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use keel_core::categorize::Categorizer;
use keel_core::db::Database;
use keel_core::models::NewTransaction;

pub fn cmd_add(
    db: &Database,
    account_name: &str,
    date: &str,
    description: &str,
    amount: f64,
    transfer: bool,
) -> Result<()> {
    let account = db
        .list_accounts()?
        .into_iter()
        .find(|a| a.name == account_name)
        .ok_or_else(|| anyhow!("Unknown account: {} (run `keel accounts add`)", account_name))?;

    let posted_at = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .context("Invalid --date format (use YYYY-MM-DD)")?;

    let categorizer = Categorizer::new(db);
    let (id, decision) = categorizer.insert_and_categorize(
        account.id,
        &NewTransaction {
            posted_at,
            description: description.to_string(),
            amount,
            is_transfer: transfer,
        },
    )?;

    println!(
        "Added transaction {} -> {} / {} ({:.0}% via {})",
        id,
        decision.category,
        decision.vendor,
        decision.confidence * 100.0,
        decision.why
    );
    Ok(())
}

pub fn cmd_transactions_list(db: &Database, limit: i64) -> Result<()> {
    let transactions = db.list_transactions(None, limit)?;

    if transactions.is_empty() {
        println!("No transactions yet. Add one with `keel add`.");
        return Ok(());
    }

    println!();
    println!("Recent transactions");
    println!("   ──────────────────────────────────────────────────────────────────────");
    for tx in transactions {
        println!(
            "   {:>4}  {}  {:>10.2}  {:24} {:18} {}",
            tx.id,
            tx.posted_at,
            tx.amount,
            super::truncate(&tx.description, 24),
            super::truncate(tx.category.as_deref().unwrap_or("-"), 18),
            tx.confidence
                .map(|c| format!("{:.0}%", c * 100.0))
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    Ok(())
}

pub fn cmd_categorize(db: &Database) -> Result<()> {
    let categorizer = Categorizer::new(db);
    let result = categorizer.categorize_batch()?;
    println!(
        "Categorized {}/{} pending transactions",
        result.categorized, result.total
    );
    Ok(())
}

pub fn cmd_correct(
    db: &Database,
    transaction_id: i64,
    category: &str,
    vendor: Option<&str>,
    rule_pattern: Option<&str>,
) -> Result<()> {
    let categorizer = Categorizer::new(db);
    let outcome = categorizer.learn_from_correction(
        transaction_id,
        category,
        vendor,
        rule_pattern.is_some(),
        rule_pattern,
    )?;

    println!(
        "Corrected transaction {}: {} -> {}",
        transaction_id,
        outcome.old_category.as_deref().unwrap_or("-"),
        outcome.new_category
    );
    if outcome.rule_created {
        println!("A rule was created; future matches resolve automatically.");
    }
    Ok(())
}
