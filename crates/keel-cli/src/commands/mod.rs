//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use keel_core::db::Database;

mod accounts;
mod forecast;
mod rules;
mod transactions;

pub use accounts::{cmd_accounts_add, cmd_accounts_list};
pub use forecast::{cmd_forecast, cmd_patterns};
pub use rules::{cmd_rules_add, cmd_rules_list};
pub use transactions::{cmd_add, cmd_categorize, cmd_correct, cmd_transactions_list};

/// Open the database, creating it if needed
pub fn open_db(path: &Path) -> Result<Database> {
    tracing::debug!("Opening database at {}", path.display());
    Database::new(&path.to_string_lossy())
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

pub fn cmd_init(path: &Path) -> Result<()> {
    let db = open_db(path)?;
    println!("Initialized database at {}", db.path());
    Ok(())
}

/// Trim a string for fixed-width table output
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
