//! Recurring-payment pattern detection
//!
//! Groups categorized history by a normalized vendor key, infers a
//! recurrence cadence from the day-intervals between occurrences, and scores
//! each pattern for confidence and business criticality. Patterns are
//! derived on demand from a rolling lookback window and never persisted.
//!
//! Insufficient history degrades to an empty result, never an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Duration, Utc};
use regex::Regex;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Cadence, Pattern, Transaction};

/// Default history window for detection
pub const DEFAULT_LOOKBACK_DAYS: i64 = 120;

/// Fewer lookback transactions than this yields no patterns at all
const MIN_HISTORY: usize = 8;
/// Occurrences required before a group is considered
const MIN_OCCURRENCES: usize = 2;
/// Share of intervals that must fall within a cadence's tolerance
const CADENCE_AGREEMENT: f64 = 0.75;
/// Patterns below this confidence are discarded
const CONFIDENCE_FLOOR: f64 = 0.7;
/// Only the most critical patterns are reported
const MAX_PATTERNS: usize = 15;
/// Amount at which the criticality amount factor saturates
const AMOUNT_FACTOR_CAP: f64 = 5000.0;

/// Vendor classes in priority order. A payment matching an earlier class
/// never falls through to a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VendorClass {
    Payroll,
    Rent,
    Utilities,
    Debt,
    Insurance,
    Saas,
    Professional,
}

impl VendorClass {
    fn key_prefix(&self) -> &'static str {
        match self {
            Self::Payroll => "payroll",
            Self::Rent => "rent",
            Self::Utilities => "utilities",
            Self::Debt => "debt",
            Self::Insurance => "insurance",
            Self::Saas => "saas",
            Self::Professional => "professional",
        }
    }

    /// Base criticality before amount/frequency scaling
    fn base_criticality(&self) -> f64 {
        match self {
            Self::Payroll => 1.0,
            Self::Rent => 0.9,
            Self::Debt => 0.8,
            Self::Utilities => 0.7,
            Self::Insurance => 0.6,
            Self::Saas => 0.5,
            Self::Professional => 0.5,
        }
    }
}

/// Classification keywords per class, evaluated in declaration order
const VENDOR_CLASSES: &[(VendorClass, &[&str])] = &[
    (
        VendorClass::Payroll,
        &["gusto", "adp", "paychex", "quickbooks payroll", "payroll", "salary", "wages"],
    ),
    (
        VendorClass::Rent,
        &["rent", "lease", "property management", "landlord"],
    ),
    (
        VendorClass::Utilities,
        &["electric", "gas", "water", "internet", "phone", "telecom"],
    ),
    (
        VendorClass::Debt,
        &["loan payment", "line of credit", "credit line", "bank loan", "amex", "visa", "mastercard", "credit card"],
    ),
    (
        VendorClass::Insurance,
        &["insurance", "workers comp", "liability", "property insurance"],
    ),
    (
        VendorClass::Saas,
        &["aws", "microsoft", "adobe", "salesforce", "zoom", "slack", "dropbox"],
    ),
    (
        VendorClass::Professional,
        &["legal", "accounting", "cpa", "lawyer", "attorney", "consultant"],
    ),
];

/// Categories that qualify a payment for grouping even without a class
/// keyword hit. Matches the categorization engine's business vocabulary.
const RECOGNIZED_CATEGORIES: &[&str] = &[
    "Payroll",
    "Rent",
    "Utilities",
    "Software & Technology",
    "Professional Services",
    "Insurance",
    "Banking Fees",
    "Payment Processing Fees",
    "Taxes",
];

/// Strips `#`/`*`-prefixed codes and long digit runs from vendor fragments
fn fragment_noise() -> &'static (Regex, Regex) {
    static NOISE: OnceLock<(Regex, Regex)> = OnceLock::new();
    NOISE.get_or_init(|| {
        (
            Regex::new(r"[#*]\w+").expect("static pattern"),
            Regex::new(r"\b\d{4,}\b").expect("static pattern"),
        )
    })
}

/// Detects recurring-payment patterns over the stored history
pub struct PatternDetector<'a> {
    db: &'a Database,
}

impl<'a> PatternDetector<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Detect patterns over the lookback window, most critical first.
    /// Returns at most 15 patterns; returns an empty list (not an error)
    /// when the history is too thin to say anything.
    pub fn detect(&self, account_id: Option<i64>, lookback_days: i64) -> Result<Vec<Pattern>> {
        let today = Utc::now().date_naive();
        let since = today - Duration::days(lookback_days.max(1));
        let transactions = self.db.list_transactions_since(account_id, since)?;

        if transactions.len() < MIN_HISTORY {
            debug!(
                "Only {} transactions in the last {} days; skipping pattern detection",
                transactions.len(),
                lookback_days
            );
            return Ok(Vec::new());
        }

        // Group by vendor key; the query returns date order, so each group
        // stays chronologically sorted.
        let mut groups: HashMap<String, Vec<&Transaction>> = HashMap::new();
        for tx in &transactions {
            if tx.is_transfer {
                continue; // Moves between own accounts are not vendor flows
            }
            if let Some(key) = vendor_key(tx) {
                groups.entry(key).or_default().push(tx);
            }
        }

        let mut patterns: Vec<Pattern> = groups
            .into_iter()
            .filter(|(_, txs)| txs.len() >= MIN_OCCURRENCES)
            .filter_map(|(key, txs)| analyze_group(key, &txs))
            .collect();

        patterns.sort_by(|a, b| {
            (b.business_criticality, b.confidence)
                .partial_cmp(&(a.business_criticality, a.confidence))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        patterns.truncate(MAX_PATTERNS);

        debug!("Detected {} recurring patterns", patterns.len());
        Ok(patterns)
    }
}

/// Build the normalized grouping key for a transaction, or None if the
/// payment is neither class-matched nor in a recognized business category.
fn vendor_key(tx: &Transaction) -> Option<String> {
    let name = match tx.vendor.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => &tx.description,
    };
    let name_lower = name.to_lowercase();

    for (class, keywords) in VENDOR_CLASSES {
        for keyword in *keywords {
            if name_lower.contains(keyword) {
                return Some(format!(
                    "{}_{}",
                    class.key_prefix(),
                    vendor_fragment(&name_lower, keyword)
                ));
            }
        }
    }

    // Generic bucket: recognized business category, keyed by the first
    // couple of name words
    let category = tx.category.as_deref()?;
    if RECOGNIZED_CATEGORIES.contains(&category) {
        let words: Vec<&str> = name_lower.split_whitespace().take(2).collect();
        if words.is_empty() {
            return None;
        }
        return Some(words.join("_"));
    }

    None
}

/// Pull a short vendor fragment out of a description, excluding the class
/// keyword, transaction codes, and long digit runs
fn vendor_fragment(name_lower: &str, keyword: &str) -> String {
    let (codes, digits) = fragment_noise();
    let cleaned = codes.replace_all(name_lower, "");
    let cleaned = digits.replace_all(&cleaned, "");

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| w.len() > 2 && *w != keyword)
        .take(2)
        .collect();

    if words.is_empty() {
        keyword.replace(' ', "_")
    } else {
        words.join("_")
    }
}

/// Infer the cadence of a sorted interval series: candidates are tested
/// tightest-first and the first one at >=75% agreement wins.
fn infer_cadence(intervals: &[i64]) -> Option<Cadence> {
    if intervals.is_empty() {
        return None;
    }

    for cadence in Cadence::DETECTION_ORDER {
        let expected = cadence.expected_interval_days();
        let tolerance = cadence.tolerance_days();
        let matches = intervals
            .iter()
            .filter(|&&i| (i - expected).abs() <= tolerance)
            .count();
        if matches as f64 >= intervals.len() as f64 * CADENCE_AGREEMENT {
            return Some(cadence);
        }
    }

    None
}

fn analyze_group(vendor_key: String, txs: &[&Transaction]) -> Option<Pattern> {
    let intervals: Vec<i64> = txs
        .windows(2)
        .map(|w| (w[1].posted_at - w[0].posted_at).num_days())
        .collect();

    let cadence = infer_cadence(&intervals)?;
    let expected = cadence.expected_interval_days();

    let amounts: Vec<f64> = txs.iter().map(|t| t.amount).collect();
    let avg_amount = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let variance = amounts
        .iter()
        .map(|a| (a - avg_amount).powi(2))
        .sum::<f64>()
        / amounts.len() as f64;
    let amount_std = variance.sqrt();

    let mean_abs_dev = intervals
        .iter()
        .map(|i| (i - expected).abs() as f64)
        .sum::<f64>()
        / intervals.len() as f64;
    let interval_consistency = 1.0 - (mean_abs_dev / expected as f64).min(1.0);

    let amount_consistency = if avg_amount != 0.0 {
        1.0 - (amount_std / avg_amount.abs()).min(0.5)
    } else {
        0.5
    };

    let confidence = 0.8 * interval_consistency + 0.2 * amount_consistency;
    if confidence < CONFIDENCE_FLOOR {
        debug!(
            "Discarding {} at confidence {:.3} (floor {})",
            vendor_key, confidence, CONFIDENCE_FLOOR
        );
        return None;
    }

    let base = VENDOR_CLASSES
        .iter()
        .find(|(class, _)| vendor_key.starts_with(class.key_prefix()))
        .map(|(class, _)| class.base_criticality())
        .unwrap_or(0.5);
    let amount_factor = (avg_amount.abs() / AMOUNT_FACTOR_CAP).min(1.0);
    let business_criticality =
        base * (0.7 + 0.2 * amount_factor + 0.1 * cadence.frequency_factor());

    let last = txs.last()?;
    let last_occurrence = last.posted_at;

    Some(Pattern {
        vendor_key,
        cadence,
        expected_interval_days: expected,
        avg_amount,
        amount_std,
        confidence,
        business_criticality,
        occurrences: txs.len(),
        category: last
            .category
            .clone()
            .unwrap_or_else(|| "Uncategorized".to_string()),
        last_occurrence,
        next_expected: last_occurrence + Duration::days(expected),
    })
}
