//! Data summary and recent ingestion history for the `status` command.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{AssetClass, BankType, Observation, ObservationQuery, UpdateRecord};
use crate::error::AnalyticsError;
use crate::store::ObservationStore;

/// Update records shown alongside the data summary.
pub const RECENT_UPDATES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub series_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub asset_classes: Vec<AssetClass>,
    pub bank_types: Vec<BankType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DataSummary {
    NoData,
    Available(SummaryStats),
}

/// Store contents at a glance plus the most recent ingestion cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub latest_date: Option<NaiveDate>,
    pub summary: DataSummary,
    pub recent_updates: Vec<UpdateRecord>,
}

pub fn summarize(observations: &[Observation]) -> DataSummary {
    let Some(first_date) = observations.iter().map(|o| o.date).min() else {
        return DataSummary::NoData;
    };
    let last_date = observations.iter().map(|o| o.date).max().unwrap_or(first_date);

    let series: HashSet<&str> = observations.iter().map(|o| o.series_name.as_str()).collect();
    let asset_classes: BTreeSet<AssetClass> = observations.iter().map(|o| o.asset_class).collect();
    let bank_types: BTreeSet<BankType> = observations.iter().map(|o| o.bank_type).collect();

    DataSummary::Available(SummaryStats {
        total_records: observations.len(),
        series_count: series.len(),
        first_date,
        last_date,
        asset_classes: asset_classes.into_iter().collect(),
        bank_types: bank_types.into_iter().collect(),
    })
}

pub fn status_report(store: &dyn ObservationStore) -> Result<StatusReport, AnalyticsError> {
    let data = store.query(&ObservationQuery::all())?;
    Ok(StatusReport {
        latest_date: store.latest_date()?,
        summary: summarize(&data),
        recent_updates: store.recent_updates(RECENT_UPDATES)?,
    })
}
