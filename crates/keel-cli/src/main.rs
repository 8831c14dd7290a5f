//! Keel CLI - Cash-flow intelligence for small businesses
//!
//! Usage:
//!   keel init                       Initialize database
//!   keel add --account NAME ...     Add and categorize a transaction
//!   keel correct ID CATEGORY        Correct a categorization
//!   keel patterns                   Detect recurring payments
//!   keel forecast --weeks 6         Project the cash balance

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db),
                Some(AccountsAction::Add {
                    name,
                    kind,
                    opening_balance,
                }) => commands::cmd_accounts_add(&db, &name, &kind, opening_balance),
            }
        }
        Commands::Add {
            account,
            date,
            description,
            amount,
            transfer,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_add(&db, &account, &date, &description, amount, transfer)
        }
        Commands::Transactions { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_transactions_list(&db, limit)
        }
        Commands::Categorize => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_categorize(&db)
        }
        Commands::Correct {
            transaction_id,
            category,
            vendor,
            rule_pattern,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_correct(
                &db,
                transaction_id,
                &category,
                vendor.as_deref(),
                rule_pattern.as_deref(),
            )
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(RulesAction::List) => commands::cmd_rules_list(&db),
                Some(RulesAction::Add {
                    pattern,
                    category,
                    match_type,
                    vendor,
                    priority,
                }) => commands::cmd_rules_add(
                    &db,
                    &pattern,
                    &category,
                    &match_type,
                    vendor.as_deref(),
                    priority,
                ),
            }
        }
        Commands::Patterns {
            account,
            lookback,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_patterns(&db, account, lookback, json)
        }
        Commands::Forecast {
            weeks,
            scenario,
            account,
            seed,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_forecast(&db, weeks, &scenario, account, seed, json)
        }
    }
}
