use super::{
    BarrierQuery, EdgeResult, ExternalObservation, ProbabilityEstimate, ScanOutcome, ScanSettings,
    SkipReason, SkippedObservation,
};
use crate::chain::alignment::{align, aligned_expiry, slice_at};
use crate::chain::{ChainSlice, InstrumentChain};
use crate::edge::comparator;
use crate::edge::replication::{self, SpreadReplication, Unavailable};
use crate::models::barrier::ReflectionTouch;
use crate::models::black_scholes::EuropeanDigital;
use crate::models::{BarrierDirection, BarrierParams, ProbabilityModel, DAYS_PER_YEAR};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

const SECONDS_PER_YEAR: f64 = DAYS_PER_YEAR * 24.0 * 3600.0;

/// Years from `as_of` to the end of `expiry` (24:00 UTC), floored at 0.
pub fn time_to_expiry_years(expiry: NaiveDate, as_of: DateTime<Utc>) -> f64 {
    let end = expiry.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);
    let secs = (end - as_of).num_milliseconds() as f64 / 1000.0;
    (secs / SECONDS_PER_YEAR).max(0.0)
}

/// Runs every observation against the chain and orders the results.
///
/// Each observation is independent: alignment, analytic model, replication,
/// comparison. A failure on one is recorded as a skip and the batch goes on.
/// Slices are memoised by aligned expiry for the duration of this call only.
pub fn run_scan(
    chain: &InstrumentChain,
    observations: &[ExternalObservation],
    as_of: DateTime<Utc>,
    settings: &ScanSettings,
) -> ScanOutcome {
    let mut slices: BTreeMap<NaiveDate, ChainSlice> = BTreeMap::new();
    let mut outcome = ScanOutcome::default();

    for obs in observations {
        let query = BarrierQuery::for_observation(chain.underlying(), obs);

        let evaluated = match aligned_expiry(chain, query.expiry) {
            Some(expiry) => {
                let slice = slices
                    .entry(expiry)
                    .or_insert_with(|| slice_at(chain, expiry));
                evaluate(slice, obs, &query, as_of, settings)
            }
            None => Err(SkipReason::NoCoverage {
                target: query.expiry,
            }),
        };

        match evaluated {
            Ok(result) => outcome.results.push(result),
            Err(reason) => {
                tracing::debug!(id = %obs.id, strike = obs.strike, %reason, "observation skipped");
                outcome.skipped.push(SkippedObservation {
                    id: obs.id.clone(),
                    question: obs.question.clone(),
                    reason,
                });
            }
        }
    }

    sort_results(&mut outcome.results);

    tracing::info!(
        observations = observations.len(),
        processed = outcome.results.len(),
        skipped = outcome.skipped.len(),
        signals = outcome.results.iter().filter(|r| r.classification.is_signal()).count(),
        slices = slices.len(),
        "scan complete"
    );

    outcome
}

/// Edge descending (strongest "overpriced" first), ties by strike ascending.
pub fn sort_results(results: &mut [EdgeResult]) {
    results.sort_by(|a, b| {
        b.edge
            .total_cmp(&a.edge)
            .then(a.observation.strike.total_cmp(&b.observation.strike))
    });
}

/// Estimate plus comparison for one observation against its aligned slice.
pub fn evaluate(
    slice: &ChainSlice,
    obs: &ExternalObservation,
    query: &BarrierQuery,
    as_of: DateTime<Utc>,
    settings: &ScanSettings,
) -> Result<EdgeResult, SkipReason> {
    if !(0.0..=1.0).contains(&obs.observed_probability) {
        return Err(SkipReason::InvalidObservedProbability);
    }

    let estimate = estimate(slice, query, as_of, settings)?;
    let cmp = comparator::compare(
        estimate.analytic_probability,
        estimate.replicated_probability,
        obs.observed_probability,
        &settings.thresholds,
    );

    Ok(EdgeResult {
        observation: obs.clone(),
        estimate,
        reference_probability: cmp.reference_probability,
        reference_source: cmp.reference_source,
        edge: cmp.edge,
        classification: cmp.classification,
    })
}

/// Both probability estimates for one query against an aligned slice.
pub fn estimate(
    slice: &ChainSlice,
    query: &BarrierQuery,
    as_of: DateTime<Utc>,
    settings: &ScanSettings,
) -> Result<ProbabilityEstimate, SkipReason> {
    let strike = query.strike;
    if !(strike.is_finite() && strike > 0.0) {
        return Err(SkipReason::InvalidStrike);
    }

    let (sigma, vol_quote) = slice
        .volatility_near(strike)
        .ok_or(SkipReason::MissingVolatility)?;
    let spot = vol_quote
        .spot()
        .or_else(|| slice.spot())
        .ok_or(SkipReason::MissingSpot)?;

    let ttl_years = time_to_expiry_years(query.expiry, as_of);
    let direction = query
        .direction
        .unwrap_or_else(|| BarrierDirection::infer(spot, strike));
    let params = BarrierParams::with_direction(
        spot,
        strike,
        ttl_years,
        sigma,
        settings.risk_free_rate,
        direction,
    );

    let touch = ReflectionTouch::new();
    let digital = EuropeanDigital::new();
    let analytic_probability = touch.probability(&params);
    let analytic_digital = digital.probability(&params);
    tracing::trace!(
        strike,
        spot,
        sigma,
        ttl_years,
        %direction,
        touch_model = touch.name(),
        touch = analytic_probability,
        digital_model = digital.name(),
        digital = analytic_digital,
        "analytic estimates"
    );

    let replication = match direction {
        BarrierDirection::Up => replication::replicate_touch(slice, strike),
        BarrierDirection::Down => Err(Unavailable::DownBarrier),
    };
    let (replicated_probability, replication_unavailable, spread) =
        screen_replication(replication, settings.max_replicated_probability, strike);

    let market_digital = replication::market_digital(slice, strike).map(|p| match direction {
        BarrierDirection::Up => p,
        BarrierDirection::Down => (1.0 - p).max(0.0),
    });

    Ok(ProbabilityEstimate {
        analytic_probability,
        analytic_digital,
        replicated_probability,
        market_digital,
        replication_unavailable,
        spot,
        implied_volatility: sigma,
        time_to_expiry_years: ttl_years,
        direction,
        aligned_expiry: slice.expiry,
        bracket: spread.map(|s| s.bracket),
        credit: spread.map(|s| s.credit),
    })
}

/// Applies the plausibility ceiling. Values above the ceiling are discarded;
/// values in (1, ceiling] are quote noise around a certain touch and are
/// capped at 1, so a replicated probability is always in [0, 1] or absent.
/// The spread is kept for reporting even when its probability is discarded.
fn screen_replication(
    replication: Result<SpreadReplication, Unavailable>,
    ceiling: f64,
    strike: f64,
) -> (Option<f64>, Option<Unavailable>, Option<SpreadReplication>) {
    match replication {
        Ok(rep) if rep.probability > ceiling => {
            tracing::warn!(
                strike,
                probability = rep.probability,
                ceiling,
                short = rep.bracket.short_strike,
                long = rep.bracket.long_strike,
                "replicated probability implausible, using analytic reference"
            );
            (None, Some(Unavailable::Implausible), Some(rep))
        }
        Ok(rep) => (Some(rep.probability.min(1.0)), None, Some(rep)),
        Err(reason) => (None, Some(reason), None),
    }
}

// ── Strike ladder ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LadderRung {
    pub strike: f64,
    pub replication: Option<SpreadReplication>,
    pub unavailable: Option<Unavailable>,
}

impl LadderRung {
    /// Fair value of "no touch": 1 - P(touch).
    pub fn no_touch_value(&self) -> Option<f64> {
        self.replication.map(|r| 1.0 - r.probability)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ladder {
    pub target_expiry: NaiveDate,
    pub aligned_expiry: NaiveDate,
    pub rungs: Vec<LadderRung>,
}

/// Replicated touch probabilities for a list of strikes at one target expiry.
pub fn ladder(
    chain: &InstrumentChain,
    target_expiry: NaiveDate,
    strikes: &[f64],
) -> Result<Ladder, SkipReason> {
    let slice = align(chain, target_expiry).ok_or(SkipReason::NoCoverage {
        target: target_expiry,
    })?;

    let rungs = strikes
        .iter()
        .map(|&strike| match replication::replicate_touch(&slice, strike) {
            Ok(rep) => LadderRung {
                strike,
                replication: Some(rep),
                unavailable: None,
            },
            Err(reason) => LadderRung {
                strike,
                replication: None,
                unavailable: Some(reason),
            },
        })
        .collect();

    Ok(Ladder {
        target_expiry,
        aligned_expiry: slice.expiry,
        rungs,
    })
}
