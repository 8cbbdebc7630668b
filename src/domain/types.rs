//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - persisted by the observation store
//! - passed by value into the analytics functions
//! - printed as JSON by the command-line front-end

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Bank group a series reports on, derived from its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankType {
    Small,
    Large,
    Foreign,
    All,
}

impl BankType {
    pub const ALL: [BankType; 4] = [BankType::Small, BankType::Large, BankType::Foreign, BankType::All];

    pub fn as_str(self) -> &'static str {
        match self {
            BankType::Small => "small",
            BankType::Large => "large",
            BankType::Foreign => "foreign",
            BankType::All => "all",
        }
    }
}

/// Balance-sheet item a series measures, derived from its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    #[value(name = "commercial_industrial")]
    CommercialIndustrial,
    #[value(name = "real_estate")]
    RealEstate,
    Consumer,
    Deposits,
    Reserves,
    Loans,
    Other,
}

impl AssetClass {
    pub const ALL: [AssetClass; 7] = [
        AssetClass::CommercialIndustrial,
        AssetClass::RealEstate,
        AssetClass::Consumer,
        AssetClass::Deposits,
        AssetClass::Reserves,
        AssetClass::Loans,
        AssetClass::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::CommercialIndustrial => "commercial_industrial",
            AssetClass::RealEstate => "real_estate",
            AssetClass::Consumer => "consumer",
            AssetClass::Deposits => "deposits",
            AssetClass::Reserves => "reserves",
            AssetClass::Loans => "loans",
            AssetClass::Other => "other",
        }
    }
}

impl fmt::Display for BankType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BankType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BankType::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetClass::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// One `(series, date, value)` data point.
///
/// Values are in millions of dollars. `(series_name, date)` is unique in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series_name: String,
    pub date: NaiveDate,
    pub value: f64,
    pub bank_type: BankType,
    pub asset_class: AssetClass,
}

impl Observation {
    /// Build an observation, stamping the labels from the series name.
    pub fn classified(series_name: impl Into<String>, date: NaiveDate, value: f64) -> Self {
        let series_name = series_name.into();
        let (bank_type, asset_class) = crate::domain::classify(&series_name);
        Self {
            series_name,
            date,
            value,
            bank_type,
            asset_class,
        }
    }
}

/// Audit entry written once per ingestion cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub updated_at: DateTime<Utc>,
    pub records_added: usize,
    /// `success` or `error: <detail>`.
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    Success,
    Error,
}

impl IngestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestionStatus::Success => "success",
            IngestionStatus::Error => "error",
        }
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one ingestion cycle. Always returned, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub status: IngestionStatus,
    /// Rows handed to the store (duplicates already present are ignored there).
    pub records_added: usize,
    pub documents_examined: usize,
    pub message: String,
}

impl IngestionResult {
    pub fn is_success(&self) -> bool {
        self.status == IngestionStatus::Success
    }
}

/// Inclusive date bounds; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

/// Store query filter. All parts are optional and AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationQuery {
    pub series_name: Option<String>,
    pub range: DateRange,
}

impl ObservationQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_range(range: DateRange) -> Self {
        Self {
            series_name: None,
            range,
        }
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.series_name
            .as_deref()
            .is_none_or(|name| obs.series_name == name)
            && self.range.contains(obs.date)
    }
}
