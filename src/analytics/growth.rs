//! Multi-horizon growth rates.
//!
//! For each observation we compare against the same series 1, 4 and 52
//! periods earlier (week-over-week, "month"-over-month, year-over-year):
//!
//! ```text
//! change = (current - lagged) / lagged * 100
//! ```
//!
//! Lags are positional within a series after sorting by date, so a missing
//! week shifts the comparison rather than leaving a hole. A missing or zero
//! lagged value yields `None`.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::analytics::validate_range;
use crate::domain::{AssetClass, DateRange, Observation, ObservationQuery};
use crate::error::AnalyticsError;
use crate::math::pct_change;
use crate::store::ObservationStore;

pub const WOW_LAG: usize = 1;
pub const MOM_LAG: usize = 4;
pub const YOY_LAG: usize = 52;

/// Most recent observations kept per series before computing growth.
pub const MAX_ROWS_PER_SERIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    #[serde(flatten)]
    pub observation: Observation,
    pub wow_change: Option<f64>,
    pub mom_change: Option<f64>,
    pub yoy_change: Option<f64>,
}

/// Annotate observations with WoW / MoM / YoY percent changes.
///
/// Input order does not matter; output is sorted by date (stable, so rows with
/// equal dates keep their input order).
pub fn calculate_growth_rates(observations: &[Observation]) -> Vec<GrowthRow> {
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|o| o.date);

    let mut history: HashMap<&str, Vec<f64>> = HashMap::new();
    sorted
        .into_iter()
        .map(|obs| {
            let past = history.entry(obs.series_name.as_str()).or_default();
            let row = GrowthRow {
                observation: obs.clone(),
                wow_change: lagged_change(past, obs.value, WOW_LAG),
                mom_change: lagged_change(past, obs.value, MOM_LAG),
                yoy_change: lagged_change(past, obs.value, YOY_LAG),
            };
            past.push(obs.value);
            row
        })
        .collect()
}

/// `past` holds earlier values of the same series, oldest first.
fn lagged_change(past: &[f64], current: f64, lag: usize) -> Option<f64> {
    let idx = past.len().checked_sub(lag)?;
    pct_change(current, past[idx])
}

/// Parameters of a growth-rate request.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthQuery {
    pub range: DateRange,
    /// `None` considers every asset class.
    pub asset_class: Option<AssetClass>,
    /// Number of series to analyse, picked by observation count.
    pub max_series: usize,
}

impl Default for GrowthQuery {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            asset_class: Some(AssetClass::CommercialIndustrial),
            max_series: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthReport {
    pub series: Vec<String>,
    /// Only rows with a defined year-over-year change.
    pub rows: Vec<GrowthRow>,
}

pub fn growth_report(store: &dyn ObservationStore, query: &GrowthQuery) -> Result<GrowthReport, AnalyticsError> {
    validate_range(&query.range)?;

    let mut data = store.query(&ObservationQuery::in_range(query.range))?;
    if let Some(asset_class) = query.asset_class {
        data.retain(|o| o.asset_class == asset_class);
    }

    let series = top_series_by_count(&data, query.max_series);
    let selected: HashSet<&str> = series.iter().map(String::as_str).collect();
    data.retain(|o| selected.contains(o.series_name.as_str()));

    let data = keep_recent_per_series(data, MAX_ROWS_PER_SERIES);
    let rows = calculate_growth_rates(&data)
        .into_iter()
        .filter(|r| r.yoy_change.is_some())
        .collect();

    Ok(GrowthReport { series, rows })
}

/// Series with the most observations, descending; ties break by name.
fn top_series_by_count(data: &[Observation], n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for o in data {
        *counts.entry(o.series_name.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(n).map(|(name, _)| name.to_string()).collect()
}

/// Keep the `limit` most recent observations of each series.
fn keep_recent_per_series(mut data: Vec<Observation>, limit: usize) -> Vec<Observation> {
    data.sort_by_key(|o| o.date);
    let mut remaining: HashMap<String, usize> = HashMap::new();
    for o in &data {
        *remaining.entry(o.series_name.clone()).or_default() += 1;
    }
    data.into_iter()
        .filter(|o| {
            let left = remaining.get_mut(&o.series_name).map_or(0, |c| {
                let before = *c;
                *c -= 1;
                before
            });
            left <= limit
        })
        .collect()
}
