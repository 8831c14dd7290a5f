//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keel - Cash-flow intelligence for small businesses
#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Transaction categorization and cash-flow forecasting", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "keel.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage bank accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Add a transaction (categorized on insert)
    Add {
        /// Account name
        #[arg(short, long)]
        account: String,

        /// Posting date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Transaction description as it appears on the statement
        #[arg(long)]
        description: String,

        /// Signed amount: positive = inflow, negative = outflow
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,

        /// Mark as a transfer between own accounts
        #[arg(long)]
        transfer: bool,
    },

    /// List recent transactions
    Transactions {
        /// Maximum number to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },

    /// Categorize stored transactions that have no category yet
    Categorize,

    /// Correct a transaction's category (the engine learns from this)
    Correct {
        /// Transaction id
        transaction_id: i64,

        /// The category it should have been
        category: String,

        /// Also correct the vendor
        #[arg(long)]
        vendor: Option<String>,

        /// Create a contains-rule with this pattern immediately
        #[arg(long)]
        rule_pattern: Option<String>,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Detect recurring payment patterns
    Patterns {
        /// Restrict to one account id
        #[arg(long)]
        account: Option<i64>,

        /// History window in days
        #[arg(long, default_value_t = 120)]
        lookback: i64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Generate a cash-flow forecast
    Forecast {
        /// Forecast horizon in weeks (clamped to 4-8)
        #[arg(short, long, default_value_t = 6)]
        weeks: u32,

        /// Scenario: optimistic, base, or pessimistic
        #[arg(short, long, default_value = "base")]
        scenario: String,

        /// Restrict to one account id
        #[arg(long)]
        account: Option<i64>,

        /// Jitter seed for reproducible projections
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Print the full forecast as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List accounts
    List,

    /// Add an account
    Add {
        /// Account name
        name: String,

        /// Account kind: checking, savings, or credit
        #[arg(short, long, default_value = "checking")]
        kind: String,

        /// Balance at the start of the recorded ledger
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        opening_balance: f64,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List,

    /// Add a rule
    Add {
        /// Pattern to match against descriptions
        pattern: String,

        /// Category to assign on match
        category: String,

        /// Match type: exact, contains, or regex
        #[arg(short, long, default_value = "contains")]
        match_type: String,

        /// Vendor to assign on match
        #[arg(long)]
        vendor: Option<String>,

        /// Evaluation priority (lower = evaluated first)
        #[arg(short, long, default_value_t = 100)]
        priority: i64,
    },
}
