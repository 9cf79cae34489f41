pub mod orchestrator;
pub mod report;

use crate::edge::comparator::{Classification, EdgeThresholds, ReferenceSource};
use crate::edge::replication::{Bracket, Unavailable};
use crate::models::BarrierDirection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A touch market as observed on a prediction venue, already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalObservation {
    pub id: String,
    pub question: String,
    pub strike: f64,
    pub expiry: NaiveDate,
    /// Price of "Yes", read as a probability in [0, 1]
    pub observed_probability: f64,
    pub url: String,
    /// Direction stated by the market text, if any
    pub direction: Option<BarrierDirection>,
}

/// What one observation asks of the chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarrierQuery {
    pub underlying: String,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub direction: Option<BarrierDirection>,
}

impl BarrierQuery {
    pub fn for_observation(underlying: &str, obs: &ExternalObservation) -> Self {
        Self {
            underlying: underlying.to_string(),
            strike: obs.strike,
            expiry: obs.expiry,
            direction: obs.direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityEstimate {
    /// Reflection-principle touch probability, always defined
    pub analytic_probability: f64,
    /// Black-Scholes terminal probability for the same barrier
    pub analytic_digital: f64,
    pub replicated_probability: Option<f64>,
    /// Mark-price vertical spread read as a European digital
    pub market_digital: Option<f64>,
    pub replication_unavailable: Option<Unavailable>,
    pub spot: f64,
    /// Annualized decimal
    pub implied_volatility: f64,
    pub time_to_expiry_years: f64,
    pub direction: BarrierDirection,
    pub aligned_expiry: NaiveDate,
    pub bracket: Option<Bracket>,
    pub credit: Option<f64>,
}

impl ProbabilityEstimate {
    /// Touch over terminal probability; reflection caps this near 2.
    pub fn touch_to_digital_ratio(&self) -> Option<f64> {
        let touch = self.replicated_probability.unwrap_or(self.analytic_probability);
        let digital = self.market_digital.unwrap_or(self.analytic_digital);
        (digital > 0.0).then(|| touch / digital)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeResult {
    pub observation: ExternalObservation,
    pub estimate: ProbabilityEstimate,
    pub reference_probability: f64,
    pub reference_source: ReferenceSource,
    /// observed - reference
    pub edge: f64,
    pub classification: Classification,
}

/// Why an observation produced no EdgeResult. Never fatal to the scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("no listed expiry on or after {target}")]
    NoCoverage { target: NaiveDate },
    #[error("aligned slice has no underlying price")]
    MissingSpot,
    #[error("aligned slice has no call with a mark IV")]
    MissingVolatility,
    #[error("strike is not a positive number")]
    InvalidStrike,
    #[error("observed probability outside [0, 1]")]
    InvalidObservedProbability,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedObservation {
    pub id: String,
    pub question: String,
    pub reason: SkipReason,
}

/// Per-scan knobs for the core computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSettings {
    pub risk_free_rate: f64,
    pub thresholds: EdgeThresholds,
    /// Replicated probabilities above this are discarded as implausible
    pub max_replicated_probability: f64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.04,
            thresholds: EdgeThresholds::default(),
            max_replicated_probability: 1.05,
        }
    }
}

impl From<&crate::config::AppConfig> for ScanSettings {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self {
            risk_free_rate: cfg.risk_free_rate,
            thresholds: cfg.thresholds,
            max_replicated_probability: cfg.max_replicated_probability,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    /// Sorted by edge descending, then strike ascending
    pub results: Vec<EdgeResult>,
    pub skipped: Vec<SkippedObservation>,
}
