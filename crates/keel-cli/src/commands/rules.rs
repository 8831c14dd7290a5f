//! Rule command implementations

use anyhow::{anyhow, Result};
use keel_core::db::Database;
use keel_core::models::{MatchType, NewRule};

pub fn cmd_rules_list(db: &Database) -> Result<()> {
    let rules = db.list_rules()?;

    if rules.is_empty() {
        println!("No rules yet. Add one with:");
        println!("  keel rules add \"netflix\" Streaming --match-type contains");
        return Ok(());
    }

    println!();
    println!("Rules (evaluation order)");
    println!("   ─────────────────────────────────────────────────────────────────");
    for rule in rules {
        let active = if rule.active { " " } else { "✗" };
        println!(
            "   {}{:>4}  p{:<4} {:8} {:24} -> {:20} {:>4} hits",
            active,
            rule.id,
            rule.priority,
            rule.match_type.as_str(),
            super::truncate(&rule.pattern, 24),
            super::truncate(&rule.set_category, 20),
            rule.hits,
        );
    }

    Ok(())
}

pub fn cmd_rules_add(
    db: &Database,
    pattern: &str,
    category: &str,
    match_type: &str,
    vendor: Option<&str>,
    priority: i64,
) -> Result<()> {
    let match_type: MatchType = match_type
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let id = db.insert_rule(&NewRule {
        match_type,
        pattern: pattern.to_string(),
        set_category: category.to_string(),
        set_vendor: vendor.map(str::to_string),
        priority,
    })?;

    println!("Rule {} created: {} \"{}\" -> {}", id, match_type, pattern, category);
    Ok(())
}
