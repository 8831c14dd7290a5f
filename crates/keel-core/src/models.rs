//! Domain models for Keel

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub kind: AccountKind,
    /// Balance at the start of the recorded ledger; current cash is this
    /// plus the sum of the account's transaction amounts.
    pub opening_balance: f64,
    pub created_at: DateTime<Utc>,
}

/// Account types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Savings,
    Credit,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown account kind: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized bank transaction
///
/// `category`, `vendor`, `confidence`, and `why` are populated by the
/// categorization engine at insert time and overwritten by the learner when
/// the user corrects a categorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub posted_at: NaiveDate,
    pub description: String,
    /// Signed amount: positive = inflow, negative = outflow
    pub amount: f64,
    pub category: Option<String>,
    pub vendor: Option<String>,
    pub confidence: Option<f64>,
    /// Provenance of the categorization decision, e.g. `rule:netflix`,
    /// `heuristic:payroll`, `memory:vendor->Utilities`, `user_correction`
    pub why: Option<String>,
    pub is_transfer: bool,
    pub created_at: DateTime<Utc>,
}

/// A transaction to be inserted (pre-categorization)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub posted_at: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub is_transfer: bool,
}

/// How a rule pattern is matched against a description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Case-insensitive full equality
    Exact,
    /// Case-insensitive substring
    Contains,
    /// Case-insensitive regex search
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::Regex => "regex",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            "regex" => Ok(Self::Regex),
            _ => Err(format!("Unknown match type: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A categorization rule
///
/// Rules are evaluated in ascending priority order (lower number first) and
/// the first match wins. Rules are never implicitly deleted; the only
/// mutation after creation is the hit counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub match_type: MatchType,
    pub pattern: String,
    pub set_category: String,
    pub set_vendor: Option<String>,
    pub priority: i64,
    pub active: bool,
    pub hits: i64,
    pub created_at: DateTime<Utc>,
}

/// A rule to be inserted
#[derive(Debug, Clone)]
pub struct NewRule {
    pub match_type: MatchType,
    pub pattern: String,
    pub set_category: String,
    pub set_vendor: Option<String>,
    pub priority: i64,
}

/// Priority for rules created explicitly by the user
pub const MANUAL_RULE_PRIORITY: i64 = 90;

/// Priority for rules auto-promoted from repeated corrections
pub const AUTO_RULE_PRIORITY: i64 = 85;

/// A recorded user correction. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub id: i64,
    pub transaction_id: i64,
    pub old_category: Option<String>,
    pub new_category: String,
    pub old_vendor: Option<String>,
    pub new_vendor: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Recurrence cadence of a detected payment pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

impl Cadence {
    /// Cadence candidates in detection order: the tightest interval is
    /// tested first so a run of 7-day gaps never classifies as monthly.
    pub const DETECTION_ORDER: [Cadence; 4] = [
        Cadence::Weekly,
        Cadence::Biweekly,
        Cadence::Monthly,
        Cadence::Quarterly,
    ];

    pub fn expected_interval_days(&self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Biweekly => 14,
            Self::Monthly => 30,
            Self::Quarterly => 90,
        }
    }

    /// Allowed deviation, in days, for an interval to count as this cadence
    pub fn tolerance_days(&self) -> i64 {
        match self {
            Self::Weekly => 1,
            Self::Biweekly => 2,
            Self::Monthly => 3,
            Self::Quarterly => 7,
        }
    }

    /// Rank for criticality scaling: more frequent payments are more
    /// important to predict accurately.
    pub fn frequency_factor(&self) -> f64 {
        match self {
            Self::Weekly => 1.0,
            Self::Biweekly => 0.9,
            Self::Monthly => 0.8,
            Self::Quarterly => 0.6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected recurring-payment pattern
///
/// Derived on demand from the transaction history; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Normalized vendor key, e.g. `payroll_gusto` or `rent_oakview`
    pub vendor_key: String,
    pub cadence: Cadence,
    pub expected_interval_days: i64,
    pub avg_amount: f64,
    pub amount_std: f64,
    /// Blend of interval and amount consistency, in [0,1]
    pub confidence: f64,
    /// How operationally essential this payment is, in [0,1]
    pub business_criticality: f64,
    pub occurrences: usize,
    pub category: String,
    pub last_occurrence: NaiveDate,
    pub next_expected: NaiveDate,
}

impl Pattern {
    /// Whether this pattern moves cash in or out
    pub fn is_inflow(&self) -> bool {
        self.avg_amount > 0.0
    }
}

/// Named multiplier profile applied to projected flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Optimistic,
    #[default]
    Base,
    Pessimistic,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Optimistic, Scenario::Base, Scenario::Pessimistic];

    /// Parse a scenario name, defaulting to `Base` for anything unknown.
    /// Invalid structural input is clamped rather than rejected.
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "optimistic" => Self::Optimistic,
            "pessimistic" => Self::Pessimistic,
            _ => Self::Base,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::Base => "base",
            Self::Pessimistic => "pessimistic",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_parse_lenient_defaults_to_base() {
        assert_eq!(Scenario::parse_lenient("optimistic"), Scenario::Optimistic);
        assert_eq!(Scenario::parse_lenient("PESSIMISTIC"), Scenario::Pessimistic);
        assert_eq!(Scenario::parse_lenient("base"), Scenario::Base);
        assert_eq!(Scenario::parse_lenient("apocalyptic"), Scenario::Base);
        assert_eq!(Scenario::parse_lenient(""), Scenario::Base);
    }

    #[test]
    fn test_cadence_detection_order_is_tightest_first() {
        let intervals: Vec<i64> = Cadence::DETECTION_ORDER
            .iter()
            .map(|c| c.expected_interval_days())
            .collect();
        let mut sorted = intervals.clone();
        sorted.sort();
        assert_eq!(intervals, sorted);
    }

    #[test]
    fn test_match_type_round_trip() {
        for mt in [MatchType::Exact, MatchType::Contains, MatchType::Regex] {
            assert_eq!(mt.as_str().parse::<MatchType>().unwrap(), mt);
        }
        assert!("fuzzy".parse::<MatchType>().is_err());
    }
}
