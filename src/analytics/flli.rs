//! Forward-Looking Lending Index.
//!
//! A single score in `[-100, 100]` blending three components, each computed
//! from the most recent [`WINDOW`] observations of a pooled cohort:
//!
//! - loan momentum: relative change between the mean of the newer half and
//!   the mean of the older half of the loan cohort
//!   (commercial & industrial, real estate, consumer);
//! - deposit volatility: coefficient of variation (population std / mean) of
//!   the deposit cohort;
//! - reserve trend: OLS slope per observation divided by the mean of the
//!   reserve cohort.
//!
//! ```text
//! flli = clamp((0.5 * momentum - 0.3 * volatility + 0.2 * trend) * 100, -100, 100)
//! ```
//!
//! A cohort with fewer than two observations, or a degenerate denominator,
//! contributes zero.

use serde::Serialize;

use crate::analytics::validate_range;
use crate::domain::{AssetClass, DateRange, Observation, ObservationQuery};
use crate::error::AnalyticsError;
use crate::math::{linear_slope, mean, population_std, round_to, safe_ratio};
use crate::store::ObservationStore;

/// Most recent pooled observations considered per cohort.
pub const WINDOW: usize = 12;

pub const MOMENTUM_WEIGHT: f64 = 0.5;
pub const VOLATILITY_WEIGHT: f64 = 0.3;
pub const TREND_WEIGHT: f64 = 0.2;

pub const SCORE_BOUND: f64 = 100.0;

const LOAN_COHORT: [AssetClass; 3] = [
    AssetClass::CommercialIndustrial,
    AssetClass::RealEstate,
    AssetClass::Consumer,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlliScore {
    /// Rounded to 2 decimals.
    pub flli_score: f64,
    /// Components rounded to 3 decimals.
    pub loan_momentum: f64,
    pub deposit_volatility: f64,
    pub reserve_trend: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlliOutcome {
    NoData,
    Calculated(FlliScore),
}

pub fn compute_flli(observations: &[Observation]) -> FlliOutcome {
    if observations.is_empty() {
        return FlliOutcome::NoData;
    }

    let loans = recent_window(observations, |a| LOAN_COHORT.contains(&a));
    let deposits = recent_window(observations, |a| a == AssetClass::Deposits);
    let reserves = recent_window(observations, |a| a == AssetClass::Reserves);

    let momentum = loan_momentum(&loans);
    let volatility = deposit_volatility(&deposits);
    let trend = reserve_trend(&reserves);

    let raw = (MOMENTUM_WEIGHT * momentum - VOLATILITY_WEIGHT * volatility + TREND_WEIGHT * trend) * 100.0;
    FlliOutcome::Calculated(FlliScore {
        flli_score: round_to(raw.clamp(-SCORE_BOUND, SCORE_BOUND), 2),
        loan_momentum: round_to(momentum, 3),
        deposit_volatility: round_to(volatility, 3),
        reserve_trend: round_to(trend, 3),
    })
}

pub fn flli_report(store: &dyn ObservationStore, range: &DateRange) -> Result<FlliOutcome, AnalyticsError> {
    validate_range(range)?;
    let data = store.query(&ObservationQuery::in_range(*range))?;
    Ok(compute_flli(&data))
}

/// Values of the cohort pooled across series, date-sorted, last [`WINDOW`] kept.
fn recent_window(observations: &[Observation], in_cohort: impl Fn(AssetClass) -> bool) -> Vec<f64> {
    let mut cohort: Vec<&Observation> = observations.iter().filter(|o| in_cohort(o.asset_class)).collect();
    cohort.sort_by_key(|o| o.date);
    let skip = cohort.len().saturating_sub(WINDOW);
    cohort[skip..].iter().map(|o| o.value).collect()
}

fn loan_momentum(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mid = values.len() / 2;
    match (mean(&values[..mid]), mean(&values[mid..])) {
        (Some(older), Some(recent)) => safe_ratio(recent - older, older).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn deposit_volatility(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    match (population_std(values), mean(values)) {
        (Some(std), Some(m)) => safe_ratio(std, m).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn reserve_trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    match (linear_slope(values), mean(values)) {
        (Some(slope), Some(m)) => safe_ratio(slope, m).unwrap_or(0.0),
        _ => 0.0,
    }
}
