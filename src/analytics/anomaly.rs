//! Per-series z-score anomaly detection.

use std::collections::HashMap;

use serde::Serialize;

use crate::analytics::validate_range;
use crate::domain::{DateRange, Observation, ObservationQuery};
use crate::error::AnalyticsError;
use crate::math::{mean, safe_ratio, sample_std};
use crate::store::ObservationStore;

pub const DEFAULT_Z_THRESHOLD: f64 = 2.5;

/// Relative floor below which a standard deviation counts as zero.
const ZERO_VARIANCE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    #[serde(flatten)]
    pub observation: Observation,
    /// Absolute distance from the series mean in sample standard deviations.
    pub z_score: Option<f64>,
    pub is_anomaly: bool,
}

/// Score each observation against its own series' mean and sample std.
///
/// Series with fewer than two points or no variance get `z_score: None` and
/// are never flagged. Output keeps the input order.
pub fn detect_anomalies(observations: &[Observation], threshold: f64) -> Vec<AnomalyRow> {
    let mut by_series: HashMap<&str, Vec<f64>> = HashMap::new();
    for o in observations {
        by_series.entry(o.series_name.as_str()).or_default().push(o.value);
    }

    let moments: HashMap<&str, (f64, f64)> = by_series
        .into_iter()
        .filter_map(|(name, values)| {
            let m = mean(&values)?;
            let s = sample_std(&values)?;
            (s > ZERO_VARIANCE_EPS * m.abs().max(1.0)).then_some((name, (m, s)))
        })
        .collect();

    observations
        .iter()
        .map(|o| {
            let z_score = moments
                .get(o.series_name.as_str())
                .and_then(|&(m, s)| safe_ratio(o.value - m, s))
                .map(f64::abs);
            AnomalyRow {
                observation: o.clone(),
                z_score,
                is_anomaly: z_score.is_some_and(|z| z > threshold),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyQuery {
    pub threshold: f64,
    pub range: DateRange,
}

impl Default for AnomalyQuery {
    fn default() -> Self {
        Self { threshold: DEFAULT_Z_THRESHOLD, range: DateRange::default() }
    }
}

/// Flagged observations only, in store order.
pub fn anomaly_report(store: &dyn ObservationStore, query: &AnomalyQuery) -> Result<Vec<AnomalyRow>, AnalyticsError> {
    if !query.threshold.is_finite() || query.threshold < 0.0 {
        return Err(AnalyticsError::InvalidArgument(format!(
            "threshold must be a non-negative number, got {}",
            query.threshold
        )));
    }
    validate_range(&query.range)?;

    let data = store.query(&ObservationQuery::in_range(query.range))?;
    Ok(detect_anomalies(&data, query.threshold)
        .into_iter()
        .filter(|r| r.is_anomaly)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn weekly(name: &str, values: &[f64]) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::classified(name, start + Duration::weeks(i as i64), *v))
            .collect()
    }

    fn spiked(len: usize, spike: f64) -> Vec<f64> {
        let mut values: Vec<f64> = (0..len).map(|i| 100.0 + (i % 3) as f64).collect();
        values[len / 2] = spike;
        values
    }

    #[test]
    fn spikes_and_dips_both_report_a_positive_z() {
        let rows = detect_anomalies(&weekly("Deposits", &spiked(30, 200.0)), 2.5);
        let flagged: Vec<_> = rows.iter().filter(|r| r.is_anomaly).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].observation.value, 200.0);
        assert!(flagged[0].z_score.unwrap() > 2.5);

        let rows = detect_anomalies(&weekly("Deposits", &spiked(30, 0.0)), 2.5);
        let dip = rows.iter().find(|r| r.is_anomaly).unwrap();
        assert_eq!(dip.observation.value, 0.0);
        assert!(dip.z_score.unwrap() > 2.5);
        assert!(rows.iter().filter_map(|r| r.z_score).all(|z| z >= 0.0));
    }

    #[test]
    fn series_are_scored_independently() {
        // A huge but flat series must not mask a spike in a small one.
        let mut input = weekly("Reserves", &spiked(30, 200.0));
        input.extend(weekly("Loans", &vec![1.0e9; 30]));
        let rows = detect_anomalies(&input, 2.5);

        assert_eq!(rows.iter().filter(|r| r.is_anomaly).count(), 1);
        assert!(
            rows.iter()
                .filter(|r| r.observation.series_name == "Loans")
                .all(|r| r.z_score.is_none() && !r.is_anomaly)
        );
    }

    #[test]
    fn single_point_or_constant_series_has_no_z() {
        let rows = detect_anomalies(&weekly("One", &[5.0]), 2.5);
        assert_eq!(rows[0].z_score, None);
        assert!(!rows[0].is_anomaly);

        let rows = detect_anomalies(&weekly("Flat", &[0.1; 12]), 0.0);
        assert!(rows.iter().all(|r| r.z_score.is_none() && !r.is_anomaly));
    }

    #[test]
    fn uses_sample_standard_deviation() {
        // mean 2, sample std 1: |z| for both 1 and 3 is exactly 1.
        let rows = detect_anomalies(&weekly("S", &[1.0, 2.0, 3.0]), 0.5);
        assert_relative_eq!(rows[0].z_score.unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(rows[2].z_score.unwrap(), 1.0, epsilon = 1e-12);
        assert!(rows[0].is_anomaly && rows[2].is_anomaly);
        assert!(!rows[1].is_anomaly);
    }

    #[test]
    fn report_returns_only_flagged_rows() {
        let store = MemoryStore::new();
        store.insert(&weekly("Deposits", &spiked(30, 200.0))).unwrap();
        let rows = anomaly_report(&store, &AnomalyQuery::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_anomaly);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let store = MemoryStore::new();
        let query = AnomalyQuery { threshold: -1.0, ..AnomalyQuery::default() };
        assert!(matches!(anomaly_report(&store, &query), Err(AnalyticsError::InvalidArgument(_))));
    }
}
