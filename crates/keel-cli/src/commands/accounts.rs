//! Account command implementations

use anyhow::{anyhow, Result};
use keel_core::db::Database;
use keel_core::models::AccountKind;

pub fn cmd_accounts_list(db: &Database) -> Result<()> {
    let accounts = db.list_accounts()?;

    if accounts.is_empty() {
        println!("No accounts yet. Add one with:");
        println!("  keel accounts add \"Operating\" --kind checking --opening-balance 10000");
        return Ok(());
    }

    println!();
    println!("Accounts");
    println!("   ──────────────────────────────────────────────");
    for account in accounts {
        let cash = db.current_cash(Some(account.id))?;
        println!(
            "   {:>3}  {:20} {:8}  ${:>12.2}",
            account.id,
            super::truncate(&account.name, 20),
            account.kind.as_str(),
            cash
        );
    }

    Ok(())
}

pub fn cmd_accounts_add(db: &Database, name: &str, kind: &str, opening_balance: f64) -> Result<()> {
    let kind: AccountKind = kind
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let id = db.upsert_account(name, kind, opening_balance)?;
    println!("Account {} ready (id {})", name, id);
    Ok(())
}
