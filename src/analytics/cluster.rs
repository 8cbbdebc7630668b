//! k-means grouping of series by their standardized history.
//!
//! Each series becomes one row of a `series x date` matrix (mean of any
//! duplicate cells, missing cells filled with 0). Columns are standardized to
//! zero mean and unit population variance, then clustered with k-means++
//! seeding and Lloyd iterations. Several seeded restarts run in parallel and
//! the lowest-inertia fit wins, so the outcome is reproducible.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{Observation, ObservationQuery};
use crate::error::AnalyticsError;
use crate::store::ObservationStore;

pub const DEFAULT_CLUSTERS: usize = 3;
pub const MIN_CLUSTERS: usize = 2;
pub const MAX_CLUSTERS: usize = 10;

/// Member names listed per cluster.
pub const SAMPLE_NAMES: usize = 10;

const SEED: u64 = 42;
const RESTARTS: usize = 10;
const MAX_ITER: usize = 300;
const TOL: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub series_count: usize,
    /// First [`SAMPLE_NAMES`] members, alphabetical.
    pub series_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusterOutcome {
    NoData,
    InsufficientData { series_count: usize, requested: usize },
    Success { n_clusters: usize, clusters: Vec<ClusterSummary> },
}

/// Pivoted `series x date` values. Rows and columns are sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMatrix {
    pub series: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub values: DMatrix<f64>,
}

pub fn build_matrix(observations: &[Observation]) -> SeriesMatrix {
    let mut series: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dates: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for o in observations {
        series.insert(o.series_name.as_str(), 0);
        dates.insert(o.date, 0);
    }
    for (idx, slot) in series.values_mut().enumerate() {
        *slot = idx;
    }
    for (idx, slot) in dates.values_mut().enumerate() {
        *slot = idx;
    }

    let (rows, cols) = (series.len(), dates.len());
    let mut sums = DMatrix::<f64>::zeros(rows, cols);
    let mut counts = DMatrix::<f64>::zeros(rows, cols);
    for o in observations {
        let cell = (series[o.series_name.as_str()], dates[&o.date]);
        sums[cell] += o.value;
        counts[cell] += 1.0;
    }
    let values = DMatrix::from_fn(rows, cols, |r, c| {
        let n = counts[(r, c)];
        if n > 0.0 { sums[(r, c)] / n } else { 0.0 }
    });

    SeriesMatrix {
        series: series.into_keys().map(str::to_string).collect(),
        dates: dates.into_keys().collect(),
        values,
    }
}

/// Zero mean, unit population variance per column. Constant columns are
/// centred but left unscaled.
pub fn standardize_columns(m: &mut DMatrix<f64>) {
    let n = m.nrows() as f64;
    if n == 0.0 {
        return;
    }
    for mut col in m.column_iter_mut() {
        let mean = col.sum() / n;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > f64::EPSILON { std } else { 1.0 };
        for v in col.iter_mut() {
            *v = (*v - mean) / scale;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: DMatrix<f64>,
    pub inertia: f64,
}

/// Best of [`RESTARTS`] seeded k-means runs. Requires `1 <= k <= data.nrows()`.
pub fn kmeans(data: &DMatrix<f64>, k: usize, seed: u64) -> KMeansFit {
    let tol = TOL * mean_column_variance(data);

    let fits: Vec<(usize, KMeansFit)> = (0..RESTARTS)
        .into_par_iter()
        .map(|run| (run, kmeans_once(data, k, seed.wrapping_add(run as u64), tol)))
        .collect();

    // Deterministic selection: lowest inertia, ties to the earliest restart.
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.1.inertia < best.1.inertia || (f.1.inertia == best.1.inertia && f.0 < best.0) {
            best = f;
        }
    }
    best.1.clone()
}

fn kmeans_once(data: &DMatrix<f64>, k: usize, seed: u64, tol: f64) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = kmeans_plus_plus(data, k, &mut rng);
    let mut labels = assign(data, &centroids);

    for _ in 0..MAX_ITER {
        fill_empty_clusters(data, &mut labels, &mut centroids);
        let updated = recompute_centroids(data, &labels, k);
        let shift = (&updated - &centroids).norm_squared();
        centroids = updated;
        labels = assign(data, &centroids);
        if shift <= tol {
            break;
        }
    }
    fill_empty_clusters(data, &mut labels, &mut centroids);

    let inertia = (0..data.nrows()).map(|i| sq_dist(data, i, &centroids, labels[i])).sum();
    KMeansFit { labels, centroids, inertia }
}

/// D²-weighted seeding. Falls back to the first unused row once every
/// remaining point coincides with a chosen centre.
fn kmeans_plus_plus(data: &DMatrix<f64>, k: usize, rng: &mut StdRng) -> DMatrix<f64> {
    let n = data.nrows();
    let mut chosen = vec![rng.gen_range(0..n)];
    let mut d2: Vec<f64> = (0..n).map(|i| sq_dist(data, i, data, chosen[0])).collect();

    while chosen.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let target = rng.gen_range(0.0..total);
            let mut acc = 0.0;
            let mut pick = None;
            for (i, d) in d2.iter().enumerate() {
                acc += d;
                if *d > 0.0 && acc > target {
                    pick = Some(i);
                    break;
                }
            }
            pick.or_else(|| d2.iter().rposition(|d| *d > 0.0))
        } else {
            None
        };
        let next = next.or_else(|| (0..n).find(|i| !chosen.contains(i))).unwrap_or(0);

        chosen.push(next);
        for (i, d) in d2.iter_mut().enumerate() {
            *d = d.min(sq_dist(data, i, data, next));
        }
    }

    DMatrix::from_fn(k, data.ncols(), |c, j| data[(chosen[c], j)])
}

/// Nearest centroid per row; ties go to the lower cluster index.
fn assign(data: &DMatrix<f64>, centroids: &DMatrix<f64>) -> Vec<usize> {
    (0..data.nrows())
        .map(|i| {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for c in 0..centroids.nrows() {
                let d = sq_dist(data, i, centroids, c);
                if d < best_d {
                    best = c;
                    best_d = d;
                }
            }
            best
        })
        .collect()
}

/// Give every empty cluster the point farthest from its own centroid, taken
/// from a cluster that can spare one.
fn fill_empty_clusters(data: &DMatrix<f64>, labels: &mut [usize], centroids: &mut DMatrix<f64>) {
    let k = centroids.nrows();
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = (0..labels.len())
            .filter(|&i| counts[labels[i]] > 1)
            .map(|i| (i, sq_dist(data, i, centroids, labels[i])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });
        let Some((i, _)) = donor else { return };

        counts[labels[i]] -= 1;
        counts[empty] += 1;
        labels[i] = empty;
        for j in 0..data.ncols() {
            centroids[(empty, j)] = data[(i, j)];
        }
    }
}

fn recompute_centroids(data: &DMatrix<f64>, labels: &[usize], k: usize) -> DMatrix<f64> {
    let mut sums = DMatrix::<f64>::zeros(k, data.ncols());
    let mut counts = vec![0usize; k];
    for (i, &l) in labels.iter().enumerate() {
        counts[l] += 1;
        for j in 0..data.ncols() {
            sums[(l, j)] += data[(i, j)];
        }
    }
    for (c, &n) in counts.iter().enumerate() {
        if n > 0 {
            for j in 0..data.ncols() {
                sums[(c, j)] /= n as f64;
            }
        }
    }
    sums
}

/// Squared Euclidean distance between row `i` of `a` and row `j` of `b`.
fn sq_dist(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize) -> f64 {
    (0..a.ncols()).map(|col| (a[(i, col)] - b[(j, col)]).powi(2)).sum()
}

fn mean_column_variance(data: &DMatrix<f64>) -> f64 {
    let (n, d) = (data.nrows() as f64, data.ncols());
    if n == 0.0 || d == 0 {
        return 0.0;
    }
    let total: f64 = data
        .column_iter()
        .map(|col| {
            let mean = col.sum() / n;
            col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / d as f64
}

/// Cluster every series in `observations` into `k` groups.
pub fn cluster_series(observations: &[Observation], k: usize) -> Result<ClusterOutcome, AnalyticsError> {
    if k == 0 {
        return Err(AnalyticsError::InvalidArgument("number of clusters must be at least 1".into()));
    }
    if observations.is_empty() {
        return Ok(ClusterOutcome::NoData);
    }

    let mut matrix = build_matrix(observations);
    if matrix.series.len() < k {
        return Ok(ClusterOutcome::InsufficientData {
            series_count: matrix.series.len(),
            requested: k,
        });
    }

    standardize_columns(&mut matrix.values);
    let fit = kmeans(&matrix.values, k, SEED);

    let mut members: Vec<Vec<&str>> = vec![Vec::new(); k];
    for (name, &label) in matrix.series.iter().zip(&fit.labels) {
        members[label].push(name);
    }
    let clusters = members
        .into_iter()
        .enumerate()
        .map(|(cluster_id, names)| ClusterSummary {
            cluster_id,
            series_count: names.len(),
            series_names: names.into_iter().take(SAMPLE_NAMES).map(str::to_string).collect(),
        })
        .collect();

    Ok(ClusterOutcome::Success { n_clusters: k, clusters })
}

pub fn cluster_report(store: &dyn ObservationStore, k: usize) -> Result<ClusterOutcome, AnalyticsError> {
    if !(MIN_CLUSTERS..=MAX_CLUSTERS).contains(&k) {
        return Err(AnalyticsError::InvalidArgument(format!(
            "number of clusters must be between {MIN_CLUSTERS} and {MAX_CLUSTERS}, got {k}"
        )));
    }
    let data = store.query(&ObservationQuery::all())?;
    cluster_series(&data, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn weekly(name: &str, values: impl IntoIterator<Item = f64>) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 4).unwrap();
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Observation::classified(name, start + Duration::weeks(i as i64), v))
            .collect()
    }

    fn two_groups() -> Vec<Observation> {
        let mut data = Vec::new();
        for (name, base) in [("Large A", 5000.0), ("Large B", 5100.0), ("Large C", 4900.0)] {
            data.extend(weekly(name, (0..20).map(|i| base + 25.0 * i as f64)));
        }
        for (name, base) in [("Small A", 10.0), ("Small B", 12.0), ("Small C", 9.0)] {
            data.extend(weekly(name, (0..20).map(|i| base + (i % 2) as f64)));
        }
        data
    }

    fn success(outcome: ClusterOutcome) -> Vec<ClusterSummary> {
        match outcome {
            ClusterOutcome::Success { clusters, .. } => clusters,
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn matrix_is_sorted_averaged_and_zero_filled() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let data = vec![
            Observation::classified("b", d(8), 4.0),
            Observation::classified("a", d(8), 1.0),
            Observation::classified("a", d(8), 3.0),
            Observation::classified("a", d(1), 5.0),
        ];
        let m = build_matrix(&data);
        assert_eq!(m.series, vec!["a", "b"]);
        assert_eq!(m.dates, vec![d(1), d(8)]);
        assert_eq!(m.values[(0, 0)], 5.0);
        assert_eq!(m.values[(0, 1)], 2.0);
        assert_eq!(m.values[(1, 0)], 0.0);
        assert_eq!(m.values[(1, 1)], 4.0);
    }

    #[test]
    fn standardized_columns_have_zero_mean_unit_variance() {
        let mut m = DMatrix::from_row_slice(3, 2, &[1.0, 7.0, 2.0, 7.0, 3.0, 7.0]);
        standardize_columns(&mut m);
        assert_relative_eq!(m.column(0).sum(), 0.0, epsilon = 1e-12);
        let var = m.column(0).iter().map(|v| v * v).sum::<f64>() / 3.0;
        assert_relative_eq!(var, 1.0, epsilon = 1e-12);
        assert!(m.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn separates_obvious_groups() {
        let clusters = success(cluster_series(&two_groups(), 2).unwrap());
        assert_eq!(clusters.len(), 2);
        let mut groups: Vec<Vec<String>> = clusters.into_iter().map(|c| c.series_names).collect();
        groups.sort();
        assert_eq!(groups[0], vec!["Large A", "Large B", "Large C"]);
        assert_eq!(groups[1], vec!["Small A", "Small B", "Small C"]);
    }

    #[test]
    fn result_is_reproducible() {
        let data = two_groups();
        assert_eq!(cluster_series(&data, 3).unwrap(), cluster_series(&data, 3).unwrap());
    }

    #[test]
    fn identical_series_still_fill_every_cluster() {
        let mut data = Vec::new();
        for name in ["x", "y", "z"] {
            data.extend(weekly(name, [1.0, 2.0, 3.0]));
        }
        let clusters = success(cluster_series(&data, 2).unwrap());
        assert!(clusters.iter().all(|c| c.series_count > 0));
        assert_eq!(clusters.iter().map(|c| c.series_count).sum::<usize>(), 3);
    }

    #[test]
    fn too_few_series_or_no_data() {
        let data = weekly("only", [1.0, 2.0]);
        assert_eq!(
            cluster_series(&data, 3).unwrap(),
            ClusterOutcome::InsufficientData { series_count: 1, requested: 3 }
        );
        assert_eq!(cluster_series(&[], 3).unwrap(), ClusterOutcome::NoData);
        assert!(matches!(cluster_series(&data, 0), Err(AnalyticsError::InvalidArgument(_))));
    }

    #[test]
    fn member_list_is_capped() {
        let mut data = Vec::new();
        for i in 0..14 {
            data.extend(weekly(&format!("s{i:02}"), [1.0, 1.0]));
        }
        let clusters = success(cluster_series(&data, 1).unwrap());
        assert_eq!(clusters[0].series_count, 14);
        assert_eq!(clusters[0].series_names.len(), SAMPLE_NAMES);
        assert_eq!(clusters[0].series_names[0], "s00");
    }

    #[test]
    fn report_enforces_k_range() {
        let store = crate::store::MemoryStore::new();
        assert!(matches!(cluster_report(&store, 1), Err(AnalyticsError::InvalidArgument(_))));
        assert!(matches!(cluster_report(&store, 11), Err(AnalyticsError::InvalidArgument(_))));
        assert_eq!(cluster_report(&store, 2).unwrap(), ClusterOutcome::NoData);
    }
}
