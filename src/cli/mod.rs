//! Command-line parsing for the H.8 balance-sheet analytics tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the ingestion and analytics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::analytics::anomaly::DEFAULT_Z_THRESHOLD;
use crate::analytics::cluster::{DEFAULT_CLUSTERS, MAX_CLUSTERS, MIN_CLUSTERS};
use crate::domain::{AssetClass, DateRange};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "bankpulse", version, about = "Bank balance-sheet (H.8) ingestion and analytics")]
pub struct Cli {
    /// SQLite database path (overrides DATABASE_PATH).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Release archive URL (overrides H8_DATA_URL).
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database schema.
    Init,
    /// Download the latest release and ingest it.
    Download,
    /// Ingest a synthetic release generated offline.
    Demo(DemoArgs),
    /// Summarize stored data and recent ingestion cycles.
    Status(OutputArgs),
    /// Print raw observations.
    Series(SeriesArgs),
    /// Week-over-week, month-over-month and year-over-year growth rates.
    Growth(GrowthArgs),
    /// Observations far from their series mean.
    Anomalies(AnomalyArgs),
    /// Forward-Looking Lending Index.
    Flli(RangeArgs),
    /// Group series by behaviour with k-means.
    Clusters(ClusterArgs),
}

#[derive(Debug, Args, Clone, Copy)]
pub struct OutputArgs {
    /// Print JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
}

/// Inclusive date bounds (YYYY-MM-DD).
#[derive(Debug, Args, Clone, Copy)]
pub struct RangeArgs {
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl RangeArgs {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Weekly observations per synthetic series.
    #[arg(long, default_value_t = 156)]
    pub weeks: usize,

    /// Random seed for the synthetic release.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SeriesArgs {
    /// Exact series name.
    #[arg(long)]
    pub series: Option<String>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Maximum rows printed.
    #[arg(long, default_value_t = 1000)]
    pub limit: usize,
}

#[derive(Debug, Args, Clone)]
pub struct GrowthArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    #[arg(long, value_enum, default_value_t = AssetClass::CommercialIndustrial)]
    pub asset_class: AssetClass,

    /// Number of series analysed, busiest first.
    #[arg(long, default_value_t = 3)]
    pub max_series: usize,

    /// Export growth rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone, Copy)]
pub struct AnomalyArgs {
    /// Absolute z-score above which an observation is flagged.
    #[arg(long, default_value_t = DEFAULT_Z_THRESHOLD)]
    pub threshold: f64,

    #[command(flatten)]
    pub range: RangeArgs,
}

#[derive(Debug, Args, Clone, Copy)]
pub struct ClusterArgs {
    /// Number of clusters.
    #[arg(
        long,
        default_value_t = DEFAULT_CLUSTERS,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new()
            .range(MIN_CLUSTERS as u64..=MAX_CLUSTERS as u64)
    )]
    pub k: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}
