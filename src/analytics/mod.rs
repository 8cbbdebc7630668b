//! Analytics over stored observations.
//!
//! Every `*_report` function reads from an [`ObservationStore`] and never
//! writes to it. Missing or insufficient data is reported as a status value
//! on the result; only invalid arguments and storage failures are errors.
//!
//! [`ObservationStore`]: crate::store::ObservationStore

pub mod anomaly;
pub mod cluster;
pub mod flli;
pub mod growth;
pub mod summary;

pub use anomaly::{AnomalyQuery, AnomalyRow, anomaly_report, detect_anomalies};
pub use cluster::{ClusterOutcome, ClusterSummary, cluster_report, cluster_series};
pub use flli::{FlliOutcome, FlliScore, compute_flli, flli_report};
pub use growth::{GrowthQuery, GrowthReport, GrowthRow, calculate_growth_rates, growth_report};
pub use summary::{DataSummary, StatusReport, SummaryStats, status_report, summarize};

use crate::domain::DateRange;
use crate::error::AnalyticsError;

pub(crate) fn validate_range(range: &DateRange) -> Result<(), AnalyticsError> {
    match (range.start, range.end) {
        (Some(start), Some(end)) if range.is_inverted() => Err(AnalyticsError::InvalidArgument(format!(
            "start date {start} is after end date {end}"
        ))),
        _ => Ok(()),
    }
}
