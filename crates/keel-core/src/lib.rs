//! Keel Core Library
//!
//! Shared functionality for the Keel cash-flow intelligence tool:
//! - Database access and migrations
//! - Tiered transaction categorization (rules, heuristics, correction memory)
//! - Correction learning with automatic rule promotion
//! - Recurring-payment pattern detection over transaction history
//! - Short-horizon cash-flow forecasting with crisis alerts and scenarios

pub mod categorize;
pub mod db;
pub mod error;
pub mod forecast;
pub mod models;
pub mod patterns;
pub mod rng;

pub use categorize::{BatchResult, Categorization, Categorizer, CorrectionOutcome};
pub use db::Database;
pub use error::{Error, Result};
pub use forecast::{
    BusinessMetrics, CrisisAlert, DailyProjection, Forecast, ForecastConfig, Forecaster,
    Recommendation, ScenarioAnalysis, ScenarioOutcome,
};
pub use models::{
    Account, AccountKind, Cadence, Correction, MatchType, NewRule, NewTransaction, Pattern, Rule,
    Scenario, Transaction,
};
pub use patterns::PatternDetector;
pub use rng::JitterRng;
