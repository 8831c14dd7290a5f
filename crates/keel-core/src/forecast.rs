//! Short-horizon cash-flow forecasting
//!
//! Projects a daily cash balance 4-8 weeks out from the detected recurring
//! patterns, flags crisis days against a configured threshold, compares
//! optimistic/base/pessimistic scenarios, and emits a short list of
//! deterministic recommendations.
//!
//! The projection itself is a pure function of (patterns, starting cash,
//! scenario, seed): all randomness flows through the seeded jitter stream
//! and the three scenario runs share no mutable state.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Pattern, Scenario};
use crate::patterns::{PatternDetector, DEFAULT_LOOKBACK_DAYS};
use crate::rng::JitterRng;

/// Multipliers applied to projected flows under one scenario.
/// Asymmetric by design: an optimistic world pays you more and bills you
/// less, a pessimistic one the inverse.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScenarioMultipliers {
    pub revenue: f64,
    pub expenses: f64,
}

/// Forecasting configuration
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Balance below this marks a crisis day
    pub crisis_threshold: f64,
    /// Projected outflows beyond this feed the large-payments alert
    pub large_payment_threshold: f64,
    pub optimistic: ScenarioMultipliers,
    pub base: ScenarioMultipliers,
    pub pessimistic: ScenarioMultipliers,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            crisis_threshold: 1000.0,
            large_payment_threshold: 5000.0,
            optimistic: ScenarioMultipliers {
                revenue: 1.15,
                expenses: 0.95,
            },
            base: ScenarioMultipliers {
                revenue: 1.0,
                expenses: 1.0,
            },
            pessimistic: ScenarioMultipliers {
                revenue: 0.85,
                expenses: 1.10,
            },
        }
    }
}

impl ForecastConfig {
    fn multipliers(&self, scenario: Scenario) -> ScenarioMultipliers {
        match scenario {
            Scenario::Optimistic => self.optimistic,
            Scenario::Base => self.base,
            Scenario::Pessimistic => self.pessimistic,
        }
    }
}

/// A recurring payment expected on a projected day
#[derive(Debug, Clone, Serialize)]
pub struct ExpectedPayment {
    pub vendor_key: String,
    /// Signed projected amount after scenario adjustment and jitter
    pub amount: f64,
    pub confidence: f64,
    pub criticality: f64,
}

/// One day of the cash projection
#[derive(Debug, Clone, Serialize)]
pub struct DailyProjection {
    pub date: NaiveDate,
    pub cash_balance: f64,
    pub daily_inflow: f64,
    pub daily_outflow: f64,
    pub net_flow: f64,
    pub crisis_warning: bool,
    pub expected_payments: Vec<ExpectedPayment>,
    pub days_from_today: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CashFlowCrisis,
    LargePaymentsAhead,
}

/// A large single outflow inside the alert window
#[derive(Debug, Clone, Serialize)]
pub struct LargePayment {
    pub date: NaiveDate,
    pub vendor_key: String,
    pub amount: f64,
    pub criticality: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrisisAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub date: Option<NaiveDate>,
    pub projected_balance: Option<f64>,
    pub payments: Vec<LargePayment>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BusinessMetrics {
    pub cash_runway_days: f64,
    pub cash_runway_weeks: f64,
    pub monthly_recurring_revenue: f64,
    pub monthly_recurring_expenses: f64,
    pub net_monthly_recurring: f64,
    /// Fraction of patterns with confidence above 0.8
    pub forecast_confidence: f64,
    pub total_patterns: usize,
    pub critical_patterns: usize,
}

/// Outcome of one scenario's full projection run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub ending_cash: f64,
    pub minimum_cash: f64,
    pub crisis_days: usize,
    pub cash_change: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioAnalysis {
    pub optimistic: ScenarioOutcome,
    pub base: ScenarioOutcome,
    pub pessimistic: ScenarioOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub category: &'static str,
    pub priority: RecommendationPriority,
    pub title: &'static str,
    pub actions: Vec<String>,
}

/// Complete forecast result
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub weeks: u32,
    pub scenario: Scenario,
    pub current_cash: f64,
    pub crisis_threshold: f64,
    pub daily_projections: Vec<DailyProjection>,
    pub patterns: Vec<Pattern>,
    pub crisis_alerts: Vec<CrisisAlert>,
    pub business_metrics: BusinessMetrics,
    pub scenario_analysis: ScenarioAnalysis,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

/// Cash-flow forecast generator
pub struct Forecaster<'a> {
    db: &'a Database,
    config: ForecastConfig,
}

impl<'a> Forecaster<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            config: ForecastConfig::default(),
        }
    }

    pub fn with_config(db: &'a Database, config: ForecastConfig) -> Self {
        Self { db, config }
    }

    /// Generate a forecast from the stored history.
    ///
    /// `weeks` is clamped to the supported 4-8 window rather than rejected.
    /// The seed makes the whole forecast reproducible.
    pub fn generate(
        &self,
        weeks: u32,
        scenario: Scenario,
        account_id: Option<i64>,
        seed: u64,
    ) -> Result<Forecast> {
        let weeks = weeks.clamp(4, 8);
        let current_cash = self.db.current_cash(account_id)?;
        let patterns = PatternDetector::new(self.db).detect(account_id, DEFAULT_LOOKBACK_DAYS)?;
        let today = Utc::now().date_naive();

        debug!(
            "Forecasting {} weeks ({}) from ${:.2} with {} patterns",
            weeks,
            scenario,
            current_cash,
            patterns.len()
        );

        Ok(self.assemble(weeks, scenario, current_cash, &patterns, today, seed))
    }

    fn assemble(
        &self,
        weeks: u32,
        scenario: Scenario,
        current_cash: f64,
        patterns: &[Pattern],
        today: NaiveDate,
        seed: u64,
    ) -> Forecast {
        let mut rng = JitterRng::for_stream(seed, scenario_stream(scenario));
        let daily_projections = project_daily(
            &self.config,
            patterns,
            current_cash,
            weeks,
            scenario,
            today,
            &mut rng,
        );

        let crisis_alerts = self.crisis_alerts(&daily_projections, patterns);
        let business_metrics = business_metrics(&daily_projections, patterns);
        let scenario_analysis = self.scenario_analysis(patterns, current_cash, weeks, today, seed);
        let recommendations = recommendations(&daily_projections, patterns, &crisis_alerts);

        Forecast {
            weeks,
            scenario,
            current_cash,
            crisis_threshold: self.config.crisis_threshold,
            daily_projections,
            patterns: patterns.to_vec(),
            crisis_alerts,
            business_metrics,
            scenario_analysis,
            recommendations,
            generated_at: Utc::now(),
        }
    }

    /// Re-run the projection under every scenario from the same inputs.
    /// Each run draws from its own seed-derived stream, so scenarios are
    /// independently reproducible and order-insensitive.
    fn scenario_analysis(
        &self,
        patterns: &[Pattern],
        current_cash: f64,
        weeks: u32,
        today: NaiveDate,
        seed: u64,
    ) -> ScenarioAnalysis {
        let run = |scenario: Scenario| {
            let mut rng = JitterRng::for_stream(seed, scenario_stream(scenario));
            let projections = project_daily(
                &self.config,
                patterns,
                current_cash,
                weeks,
                scenario,
                today,
                &mut rng,
            );
            let ending_cash = projections
                .last()
                .map(|p| p.cash_balance)
                .unwrap_or(current_cash);
            let minimum_cash = projections
                .iter()
                .map(|p| p.cash_balance)
                .fold(f64::INFINITY, f64::min)
                .min(current_cash);
            ScenarioOutcome {
                ending_cash,
                minimum_cash,
                crisis_days: projections.iter().filter(|p| p.crisis_warning).count(),
                cash_change: ending_cash - current_cash,
            }
        };

        ScenarioAnalysis {
            optimistic: run(Scenario::Optimistic),
            base: run(Scenario::Base),
            pessimistic: run(Scenario::Pessimistic),
        }
    }

    fn crisis_alerts(
        &self,
        projections: &[DailyProjection],
        patterns: &[Pattern],
    ) -> Vec<CrisisAlert> {
        let mut alerts = Vec::new();

        if let Some(first_crisis) = projections.iter().find(|p| p.crisis_warning) {
            let days_to_crisis = first_crisis.days_from_today;
            let severity = if days_to_crisis <= 7 {
                AlertSeverity::Critical
            } else if days_to_crisis <= 14 {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };

            alerts.push(CrisisAlert {
                kind: AlertKind::CashFlowCrisis,
                severity,
                message: format!(
                    "Balance will drop below ${:.0} in {} days",
                    self.config.crisis_threshold, days_to_crisis
                ),
                date: Some(first_crisis.date),
                projected_balance: Some(first_crisis.cash_balance),
                payments: Vec::new(),
                recommendations: crisis_recommendations(first_crisis, patterns),
            });
        }

        // Large outflows inside the next two weeks
        let mut large_payments: Vec<LargePayment> = Vec::new();
        for projection in projections.iter().filter(|p| p.days_from_today < 14) {
            for payment in &projection.expected_payments {
                if payment.amount < -self.config.large_payment_threshold {
                    large_payments.push(LargePayment {
                        date: projection.date,
                        vendor_key: payment.vendor_key.clone(),
                        amount: payment.amount,
                        criticality: payment.criticality,
                    });
                }
            }
        }

        if !large_payments.is_empty() {
            let count = large_payments.len();
            let total: f64 = large_payments.iter().map(|p| p.amount).sum();
            large_payments.truncate(5);
            alerts.push(CrisisAlert {
                kind: AlertKind::LargePaymentsAhead,
                severity: AlertSeverity::Medium,
                message: format!(
                    "{} large payments totaling ${:.0} due within 14 days",
                    count,
                    total.abs()
                ),
                date: large_payments.first().map(|p| p.date),
                projected_balance: None,
                payments: large_payments,
                recommendations: Vec::new(),
            });
        }

        alerts
    }
}

/// Stable per-scenario stream index for jitter derivation
fn scenario_stream(scenario: Scenario) -> u64 {
    match scenario {
        Scenario::Optimistic => 0,
        Scenario::Base => 1,
        Scenario::Pessimistic => 2,
    }
}

/// A date is due for a pattern when it falls within the tolerance window of
/// the next expected occurrence, or of any later cycle by modular
/// arithmetic: `(date - next_expected) mod interval` within tolerance of
/// either end of the cycle.
fn is_due(date: NaiveDate, pattern: &Pattern) -> bool {
    let interval = pattern.expected_interval_days;
    if interval <= 0 {
        return false;
    }
    let tolerance = (interval as f64 * 0.08).max(1.0);
    let diff = (date - pattern.next_expected).num_days();

    if (diff.abs() as f64) <= tolerance {
        return true;
    }
    if diff > 0 {
        let rem = (diff % interval) as f64;
        rem <= tolerance || interval as f64 - rem <= tolerance
    } else {
        false
    }
}

/// Project the daily cash balance from today through the horizon.
/// Pure in (config, patterns, starting cash, scenario, today, rng).
fn project_daily(
    config: &ForecastConfig,
    patterns: &[Pattern],
    starting_cash: f64,
    weeks: u32,
    scenario: Scenario,
    today: NaiveDate,
    rng: &mut JitterRng,
) -> Vec<DailyProjection> {
    let multipliers = config.multipliers(scenario);
    let end = today + Duration::days(weeks as i64 * 7);

    let mut projections = Vec::new();
    let mut running_cash = starting_cash;
    let mut date = today;

    while date <= end {
        let mut daily_inflow = 0.0;
        let mut daily_outflow = 0.0;
        let mut expected_payments = Vec::new();

        for pattern in patterns {
            if !is_due(date, pattern) {
                continue;
            }

            let mut amount = if pattern.avg_amount > 0.0 {
                pattern.avg_amount * multipliers.revenue
            } else {
                pattern.avg_amount * multipliers.expenses
            };

            // Bounded jitter: at most 30% of the historical spread, capped
            // at 10% of the projected amount
            if pattern.amount_std > 0.0 {
                let spread = (pattern.amount_std * 0.3).min(amount.abs() * 0.1);
                amount += rng.normal(spread);
            }

            if amount > 0.0 {
                daily_inflow += amount;
            } else {
                daily_outflow += -amount;
            }

            expected_payments.push(ExpectedPayment {
                vendor_key: pattern.vendor_key.clone(),
                amount,
                confidence: pattern.confidence,
                criticality: pattern.business_criticality,
            });
        }

        let net_flow = daily_inflow - daily_outflow;
        running_cash += net_flow;

        projections.push(DailyProjection {
            date,
            cash_balance: running_cash,
            daily_inflow,
            daily_outflow,
            net_flow,
            crisis_warning: running_cash < config.crisis_threshold,
            expected_payments,
            days_from_today: (date - today).num_days(),
        });

        date = date + Duration::days(1);
    }

    projections
}

/// Actionable steps attached to a crisis alert
fn crisis_recommendations(crisis: &DailyProjection, patterns: &[Pattern]) -> Vec<String> {
    let mut recommendations = Vec::new();

    let deferrable: Vec<&Pattern> = patterns
        .iter()
        .filter(|p| p.business_criticality < 0.7 && p.avg_amount < 0.0)
        .take(3)
        .collect();
    if !deferrable.is_empty() {
        let total: f64 = deferrable.iter().map(|p| p.avg_amount.abs()).sum();
        recommendations.push(format!(
            "Consider deferring ${:.0} in non-critical expenses",
            total
        ));
    }

    let shortage = crisis.cash_balance.abs();
    recommendations.push(format!(
        "Ensure a ${:.0} line of credit is available",
        shortage * 1.5
    ));
    recommendations.push("Contact clients to accelerate outstanding invoice payments".to_string());

    recommendations
}

/// Weekly-equivalent amount of a pattern, for recurring-revenue math
fn weekly_equivalent(pattern: &Pattern) -> f64 {
    pattern.avg_amount * 7.0 / pattern.expected_interval_days as f64
}

fn business_metrics(projections: &[DailyProjection], patterns: &[Pattern]) -> BusinessMetrics {
    if projections.is_empty() {
        return BusinessMetrics::default();
    }

    let current_cash = projections[0].cash_balance;
    let burn_days: Vec<f64> = projections
        .iter()
        .filter(|p| p.net_flow < 0.0)
        .map(|p| p.net_flow.abs())
        .collect();
    let cash_runway_days = if burn_days.is_empty() {
        999.0
    } else {
        let avg_daily_burn = burn_days.iter().sum::<f64>() / burn_days.len() as f64;
        current_cash / avg_daily_burn
    };

    let weekly_inflows: f64 = patterns
        .iter()
        .filter(|p| p.avg_amount > 0.0)
        .map(weekly_equivalent)
        .sum();
    let weekly_outflows: f64 = patterns
        .iter()
        .filter(|p| p.avg_amount < 0.0)
        .map(|p| weekly_equivalent(p).abs())
        .sum();

    let high_confidence = patterns.iter().filter(|p| p.confidence > 0.8).count();
    let forecast_confidence = if patterns.is_empty() {
        0.0
    } else {
        high_confidence as f64 / patterns.len() as f64
    };

    // 4.33 weeks per month
    BusinessMetrics {
        cash_runway_days,
        cash_runway_weeks: cash_runway_days / 7.0,
        monthly_recurring_revenue: weekly_inflows * 4.33,
        monthly_recurring_expenses: weekly_outflows * 4.33,
        net_monthly_recurring: (weekly_inflows - weekly_outflows) * 4.33,
        forecast_confidence,
        total_patterns: patterns.len(),
        critical_patterns: patterns
            .iter()
            .filter(|p| p.business_criticality > 0.8)
            .count(),
    }
}

/// Deterministic, threshold-triggered recommendations in priority order,
/// capped at five
fn recommendations(
    projections: &[DailyProjection],
    patterns: &[Pattern],
    alerts: &[CrisisAlert],
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    let urgent = alerts
        .iter()
        .any(|a| matches!(a.severity, AlertSeverity::Critical | AlertSeverity::High));
    if urgent {
        out.push(Recommendation {
            category: "Cash Flow Management",
            priority: RecommendationPriority::High,
            title: "Immediate cash flow action required",
            actions: vec![
                "Review all upcoming large payments for deferral options".to_string(),
                "Accelerate collection of outstanding invoices".to_string(),
                "Consider short-term financing options".to_string(),
            ],
        });
    }

    // A single expense carrying most of the recurring outflow is a cost
    // concentration risk
    let weekly_outflows: Vec<(&Pattern, f64)> = patterns
        .iter()
        .filter(|p| p.avg_amount < 0.0)
        .map(|p| (p, weekly_equivalent(p).abs()))
        .collect();
    let total_outflow: f64 = weekly_outflows.iter().map(|(_, w)| w).sum();
    if total_outflow > 0.0 {
        if let Some((dominant, weekly)) = weekly_outflows
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        {
            if weekly / total_outflow > 0.4 {
                out.push(Recommendation {
                    category: "Cost Review",
                    priority: RecommendationPriority::Medium,
                    title: "High expense concentration",
                    actions: vec![
                        format!(
                            "{} accounts for {:.0}% of recurring expenses",
                            dominant.vendor_key,
                            weekly / total_outflow * 100.0
                        ),
                        "Review pricing and alternatives for this expense".to_string(),
                    ],
                });
            }
        }
    }

    if patterns.iter().any(|p| p.confidence < 0.8) {
        out.push(Recommendation {
            category: "Forecast Accuracy",
            priority: RecommendationPriority::Medium,
            title: "Improve payment predictability",
            actions: vec![
                "Set up automatic payments for regular expenses".to_string(),
                "Negotiate fixed payment dates with vendors".to_string(),
                "Review irregular payment patterns".to_string(),
            ],
        });
    }

    let critical = alerts
        .iter()
        .any(|a| a.severity == AlertSeverity::Critical);
    let positive_flow: f64 = projections
        .iter()
        .map(|p| p.net_flow)
        .filter(|f| *f > 0.0)
        .sum();
    if !critical && positive_flow > 0.0 {
        out.push(Recommendation {
            category: "Growth Planning",
            priority: RecommendationPriority::Low,
            title: "Cash available for investment",
            actions: vec![
                format!("Projected ${:.0} excess cash over the horizon", positive_flow),
                "Consider strategic investments or building reserves".to_string(),
            ],
        });
    }

    out.truncate(5);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cadence;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn test_pattern(
        vendor_key: &str,
        cadence: Cadence,
        avg_amount: f64,
        amount_std: f64,
        criticality: f64,
    ) -> Pattern {
        let interval = cadence.expected_interval_days();
        let last = today() - Duration::days(interval - 3);
        Pattern {
            vendor_key: vendor_key.to_string(),
            cadence,
            expected_interval_days: interval,
            avg_amount,
            amount_std,
            confidence: 0.9,
            business_criticality: criticality,
            occurrences: 4,
            category: "Test".to_string(),
            last_occurrence: last,
            next_expected: last + Duration::days(interval),
        }
    }

    fn forecaster_fixture() -> (Database, ForecastConfig) {
        (Database::in_memory().unwrap(), ForecastConfig::default())
    }

    #[test]
    fn test_zero_patterns_is_flat() {
        let config = ForecastConfig::default();
        let mut rng = JitterRng::seed_from(1);
        let projections =
            project_daily(&config, &[], 5000.0, 6, Scenario::Base, today(), &mut rng);

        assert_eq!(projections.len(), 6 * 7 + 1);
        for p in &projections {
            assert_eq!(p.net_flow, 0.0);
            assert_eq!(p.cash_balance, 5000.0);
            assert!(!p.crisis_warning);
        }
    }

    #[test]
    fn test_day_one_crisis_below_threshold() {
        let config = ForecastConfig::default(); // threshold 1000
        let mut rng = JitterRng::seed_from(1);
        let projections =
            project_daily(&config, &[], 500.0, 4, Scenario::Base, today(), &mut rng);

        assert!(projections[0].crisis_warning);
        assert!(projections.iter().all(|p| p.crisis_warning));
    }

    #[test]
    fn test_is_due_tolerance_window_and_future_cycles() {
        let p = test_pattern("rent_oakview", Cadence::Monthly, -2500.0, 0.0, 0.9);
        let next = p.next_expected;

        // Monthly tolerance is max(0.08 * 30, 1) = 2.4 days
        assert!(is_due(next, &p));
        assert!(is_due(next + Duration::days(2), &p));
        assert!(is_due(next - Duration::days(2), &p));
        assert!(!is_due(next + Duration::days(3), &p));
        assert!(!is_due(next - Duration::days(3), &p));

        // Later cycles match by modular arithmetic
        assert!(is_due(next + Duration::days(30), &p));
        assert!(is_due(next + Duration::days(62), &p));
        assert!(!is_due(next + Duration::days(15), &p));
    }

    #[test]
    fn test_due_pattern_moves_balance() {
        let config = ForecastConfig::default();
        let p = test_pattern("rent_oakview", Cadence::Monthly, -2500.0, 0.0, 0.9);
        let mut rng = JitterRng::seed_from(1);
        let projections =
            project_daily(&config, &[p], 10_000.0, 6, Scenario::Base, today(), &mut rng);

        let total_outflow: f64 = projections.iter().map(|p| p.daily_outflow).sum();
        assert!(total_outflow > 0.0);
        let last = projections.last().unwrap();
        assert!(last.cash_balance < 10_000.0);

        // Zero historical spread means zero jitter: every projected charge
        // is exactly the scenario-adjusted average
        for payment in projections.iter().flat_map(|p| &p.expected_payments) {
            assert_eq!(payment.amount, -2500.0);
        }
    }

    #[test]
    fn test_scenario_ordering_for_positive_flows() {
        let (db, config) = forecaster_fixture();
        let forecaster = Forecaster::with_config(&db, config);
        let patterns = vec![
            test_pattern("payroll_client_retainer", Cadence::Weekly, 3000.0, 0.0, 0.9),
            test_pattern("saas_royalties", Cadence::Monthly, 900.0, 0.0, 0.5),
        ];

        let analysis = forecaster.scenario_analysis(&patterns, 2000.0, 6, today(), 7);
        assert!(analysis.optimistic.ending_cash >= analysis.base.ending_cash);
        assert!(analysis.base.ending_cash >= analysis.pessimistic.ending_cash);
        assert!(analysis.base.cash_change > 0.0);
    }

    #[test]
    fn test_forecast_is_deterministic_for_a_seed() {
        let (db, config) = forecaster_fixture();
        let forecaster = Forecaster::with_config(&db, config);
        let patterns = vec![test_pattern(
            "utilities_metro_power",
            Cadence::Monthly,
            -800.0,
            120.0,
            0.7,
        )];

        let a = forecaster.assemble(6, Scenario::Base, 9000.0, &patterns, today(), 42);
        let b = forecaster.assemble(6, Scenario::Base, 9000.0, &patterns, today(), 42);
        let c = forecaster.assemble(6, Scenario::Base, 9000.0, &patterns, today(), 43);

        let balances = |f: &Forecast| -> Vec<u64> {
            f.daily_projections
                .iter()
                .map(|p| p.cash_balance.to_bits())
                .collect()
        };
        assert_eq!(balances(&a), balances(&b));
        assert_ne!(balances(&a), balances(&c));
    }

    #[test]
    fn test_crisis_alert_severity_by_breach_day() {
        let (db, config) = forecaster_fixture();
        let forecaster = Forecaster::with_config(&db, config);

        // Starting below the threshold breaches on day zero
        let forecast = forecaster.assemble(4, Scenario::Base, 500.0, &[], today(), 1);
        let crisis = forecast
            .crisis_alerts
            .iter()
            .find(|a| a.kind == AlertKind::CashFlowCrisis)
            .expect("crisis alert");
        assert_eq!(crisis.severity, AlertSeverity::Critical);
        assert!(!crisis.recommendations.is_empty());
    }

    #[test]
    fn test_large_payments_alert() {
        let (db, config) = forecaster_fixture();
        let forecaster = Forecaster::with_config(&db, config);
        let patterns = vec![test_pattern(
            "payroll_gusto",
            Cadence::Biweekly,
            -8000.0,
            0.0,
            1.0,
        )];

        // Biweekly pattern due a few days out, well inside the 14-day window
        let forecast = forecaster.assemble(4, Scenario::Base, 50_000.0, &patterns, today(), 1);
        let alert = forecast
            .crisis_alerts
            .iter()
            .find(|a| a.kind == AlertKind::LargePaymentsAhead)
            .expect("large payment alert");
        assert_eq!(alert.severity, AlertSeverity::Medium);
        assert!(!alert.payments.is_empty());
        assert_eq!(alert.payments[0].vendor_key, "payroll_gusto");
    }

    #[test]
    fn test_business_metrics_weekly_normalization() {
        let patterns = vec![
            test_pattern("payroll_invoices", Cadence::Monthly, 10_000.0, 0.0, 0.9),
            test_pattern("rent_oakview", Cadence::Monthly, -2500.0, 0.0, 0.85),
        ];
        let config = ForecastConfig::default();
        let mut rng = JitterRng::seed_from(1);
        let projections = project_daily(
            &config,
            &patterns,
            20_000.0,
            6,
            Scenario::Base,
            today(),
            &mut rng,
        );

        let metrics = business_metrics(&projections, &patterns);
        // 10000/month -> 2333.33/week -> 10103.33 MRR
        assert!((metrics.monthly_recurring_revenue - 10_103.33).abs() < 1.0);
        assert!((metrics.monthly_recurring_expenses - 2_525.83).abs() < 1.0);
        assert_eq!(metrics.total_patterns, 2);
        assert_eq!(metrics.critical_patterns, 2);
        assert_eq!(metrics.forecast_confidence, 1.0);
    }

    #[test]
    fn test_runway_is_capped_when_never_burning() {
        let patterns = vec![test_pattern(
            "payroll_invoices",
            Cadence::Weekly,
            5000.0,
            0.0,
            0.9,
        )];
        let config = ForecastConfig::default();
        let mut rng = JitterRng::seed_from(1);
        let projections = project_daily(
            &config,
            &patterns,
            1_000.0,
            4,
            Scenario::Base,
            today(),
            &mut rng,
        );

        let metrics = business_metrics(&projections, &patterns);
        assert_eq!(metrics.cash_runway_days, 999.0);
    }

    #[test]
    fn test_recommendations_priority_order_and_cap() {
        let (db, config) = forecaster_fixture();
        let forecaster = Forecaster::with_config(&db, config);

        // Crisis from day one, one dominant expense, one low-confidence
        // pattern: every trigger fires, order must hold
        let mut weak = test_pattern("saas_toolchain", Cadence::Monthly, -400.0, 0.0, 0.5);
        weak.confidence = 0.72;
        let patterns = vec![
            test_pattern("rent_oakview", Cadence::Monthly, -6000.0, 0.0, 0.9),
            weak,
        ];

        let forecast = forecaster.assemble(4, Scenario::Base, 200.0, &patterns, today(), 1);
        let recs = &forecast.recommendations;
        assert!(!recs.is_empty());
        assert!(recs.len() <= 5);
        assert_eq!(recs[0].priority, RecommendationPriority::High);
        assert!(recs
            .windows(2)
            .all(|w| priority_rank(w[0].priority) <= priority_rank(w[1].priority)));
        // Critical alert suppresses the growth recommendation
        assert!(recs.iter().all(|r| r.category != "Growth Planning"));
    }

    fn priority_rank(p: RecommendationPriority) -> u8 {
        match p {
            RecommendationPriority::High => 0,
            RecommendationPriority::Medium => 1,
            RecommendationPriority::Low => 2,
        }
    }

    #[test]
    fn test_weeks_clamped_via_generate() {
        let db = Database::in_memory().unwrap();
        let forecaster = Forecaster::new(&db);

        let narrow = forecaster.generate(1, Scenario::Base, None, 1).unwrap();
        assert_eq!(narrow.weeks, 4);
        assert_eq!(narrow.daily_projections.len(), 4 * 7 + 1);

        let wide = forecaster.generate(99, Scenario::Base, None, 1).unwrap();
        assert_eq!(wide.weeks, 8);
        assert_eq!(wide.daily_projections.len(), 8 * 7 + 1);
    }
}
