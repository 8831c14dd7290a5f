//! Pattern and forecast command implementations

use anyhow::Result;
use keel_core::db::Database;
use keel_core::forecast::Forecaster;
use keel_core::models::Scenario;
use keel_core::patterns::PatternDetector;

pub fn cmd_patterns(db: &Database, account: Option<i64>, lookback: i64, json: bool) -> Result<()> {
    let patterns = PatternDetector::new(db).detect(account, lookback)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }

    if patterns.is_empty() {
        println!("No recurring patterns found in the last {} days.", lookback);
        println!("Pattern detection needs a few months of categorized history.");
        return Ok(());
    }

    println!();
    println!("Recurring payment patterns");
    println!("   ──────────────────────────────────────────────────────────────────────");
    for p in &patterns {
        println!(
            "   {:28} {:9}  {:>10.2}  conf {:.2}  crit {:.2}  next {}",
            super::truncate(&p.vendor_key, 28),
            p.cadence.as_str(),
            p.avg_amount,
            p.confidence,
            p.business_criticality,
            p.next_expected,
        );
    }

    Ok(())
}

pub fn cmd_forecast(
    db: &Database,
    weeks: u32,
    scenario: &str,
    account: Option<i64>,
    seed: u64,
    json: bool,
) -> Result<()> {
    let scenario = Scenario::parse_lenient(scenario);
    let forecast = Forecaster::new(db).generate(weeks, scenario, account, seed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&forecast)?);
        return Ok(());
    }

    println!();
    println!(
        "Cash-flow forecast — {} weeks, {} scenario",
        forecast.weeks, forecast.scenario
    );
    println!("   ──────────────────────────────────────────────────────────────");
    println!("   Current cash        ${:>12.2}", forecast.current_cash);
    println!("   Crisis threshold    ${:>12.2}", forecast.crisis_threshold);

    let metrics = &forecast.business_metrics;
    println!(
        "   Recurring monthly   +${:.0} / -${:.0} (net ${:.0})",
        metrics.monthly_recurring_revenue,
        metrics.monthly_recurring_expenses,
        metrics.net_monthly_recurring,
    );
    if metrics.cash_runway_days < 999.0 {
        println!("   Cash runway         {:.0} days", metrics.cash_runway_days);
    }
    println!(
        "   Patterns            {} ({} critical, {:.0}% high-confidence)",
        metrics.total_patterns,
        metrics.critical_patterns,
        metrics.forecast_confidence * 100.0,
    );

    if !forecast.crisis_alerts.is_empty() {
        println!();
        println!("Alerts");
        for alert in &forecast.crisis_alerts {
            println!("   [{:?}] {}", alert.severity, alert.message);
            for rec in &alert.recommendations {
                println!("      - {}", rec);
            }
        }
    }

    println!();
    println!("Scenario analysis");
    let analysis = &forecast.scenario_analysis;
    for (name, outcome) in [
        ("optimistic", &analysis.optimistic),
        ("base", &analysis.base),
        ("pessimistic", &analysis.pessimistic),
    ] {
        println!(
            "   {:12} ending ${:>12.2}  min ${:>12.2}  {} crisis days",
            name, outcome.ending_cash, outcome.minimum_cash, outcome.crisis_days
        );
    }

    if !forecast.recommendations.is_empty() {
        println!();
        println!("Recommendations");
        for rec in &forecast.recommendations {
            println!("   [{:?}] {}: {}", rec.priority, rec.category, rec.title);
            for action in &rec.actions {
                println!("      - {}", action);
            }
        }
    }

    Ok(())
}
