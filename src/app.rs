//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging and configuration
//! - opens the observation store
//! - dispatches to one handler per command

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::analytics::{self, AnomalyQuery, GrowthQuery};
use crate::cli::{AnomalyArgs, Cli, ClusterArgs, Command, DemoArgs, GrowthArgs, OutputArgs, RangeArgs, SeriesArgs};
use crate::config::AppConfig;
use crate::data::{H8Client, InMemoryArchive, SyntheticConfig, build_release, generate_series};
use crate::domain::{IngestionResult, ObservationQuery};
use crate::error::{AppError, EXIT_NO_DATA};
use crate::store::{ObservationStore, SqliteStore};

pub mod pipeline;

const LOG_ENV: &str = "BANKPULSE_LOG";

/// Entry point for the `bankpulse` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging();

    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(url) = cli.url {
        config.h8_data_url = url;
    }
    debug!(?config, "Loaded configuration");

    config.ensure_data_dir()?;
    let store = SqliteStore::open(&config.database_path)?;

    match cli.command {
        Command::Init => handle_init(&config),
        Command::Download => handle_download(&config, &store),
        Command::Demo(args) => handle_demo(args, &store),
        Command::Status(args) => handle_status(args, &store),
        Command::Series(args) => handle_series(args, &store),
        Command::Growth(args) => handle_growth(args, &store),
        Command::Anomalies(args) => handle_anomalies(args, &store),
        Command::Flli(args) => handle_flli(args, &store),
        Command::Clusters(args) => handle_clusters(args, &store),
    }
}

/// `RUST_LOG` wins over `BANKPULSE_LOG`; default is `info`. Logs go to stderr.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_init(config: &AppConfig) -> Result<(), AppError> {
    // Opening the store already applied the schema.
    info!(path = %config.database_path.display(), "Database initialized");
    println!("Database ready at {}", config.database_path.display());
    Ok(())
}

fn handle_download(config: &AppConfig, store: &dyn ObservationStore) -> Result<(), AppError> {
    let client = H8Client::from_config(config)?;
    let result = pipeline::run_ingestion(&client, store);
    finish_ingestion(&result, false)
}

fn handle_demo(args: DemoArgs, store: &dyn ObservationStore) -> Result<(), AppError> {
    let synthetic = SyntheticConfig {
        weeks: args.weeks,
        seed: args.seed,
        ..SyntheticConfig::default()
    };
    let release = build_release(&generate_series(&synthetic)?)?;
    let archive = InMemoryArchive::new(format!("synthetic (seed {})", args.seed), release);

    let result = pipeline::run_ingestion(&archive, store);
    finish_ingestion(&result, args.output.json)
}

/// Print the result as text or JSON; an error result also becomes the exit status.
fn finish_ingestion(result: &IngestionResult, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", crate::report::to_json(result)?);
    } else {
        println!("{}", crate::report::format_ingestion(result));
    }
    if result.is_success() {
        Ok(())
    } else {
        Err(AppError::new(EXIT_NO_DATA, result.message.clone()))
    }
}

fn handle_status(args: OutputArgs, store: &dyn ObservationStore) -> Result<(), AppError> {
    let report = analytics::status_report(store)?;
    emit(args, &report, crate::report::format_status)
}

fn handle_series(args: SeriesArgs, store: &dyn ObservationStore) -> Result<(), AppError> {
    let query = ObservationQuery {
        series_name: args.series,
        range: args.range.range(),
    };
    if query.range.is_inverted() {
        return Err(AppError::new(crate::error::EXIT_CONFIG, "--start must not be after --end."));
    }
    let mut rows = store.query(&query)?;
    rows.truncate(args.limit);
    emit(args.range.output, &rows, |r| crate::report::format_series(r))
}

fn handle_growth(args: GrowthArgs, store: &dyn ObservationStore) -> Result<(), AppError> {
    let query = GrowthQuery {
        range: args.range.range(),
        asset_class: Some(args.asset_class),
        max_series: args.max_series,
    };
    let report = analytics::growth_report(store, &query)?;

    if let Some(path) = &args.export {
        crate::io::export::write_growth_csv(path, &report.rows)?;
        info!(path = %path.display(), rows = report.rows.len(), "Exported growth rates");
    }
    emit(args.range.output, &report, crate::report::format_growth)
}

fn handle_anomalies(args: AnomalyArgs, store: &dyn ObservationStore) -> Result<(), AppError> {
    let query = AnomalyQuery {
        threshold: args.threshold,
        range: args.range.range(),
    };
    let rows = analytics::anomaly_report(store, &query)?;
    emit(args.range.output, &rows, |r| crate::report::format_anomalies(r, args.threshold))
}

fn handle_flli(args: RangeArgs, store: &dyn ObservationStore) -> Result<(), AppError> {
    let outcome = analytics::flli_report(store, &args.range())?;
    emit(args.output, &outcome, crate::report::format_flli)
}

fn handle_clusters(args: ClusterArgs, store: &dyn ObservationStore) -> Result<(), AppError> {
    let outcome = analytics::cluster_report(store, args.k)?;
    emit(args.output, &outcome, crate::report::format_clusters)
}

/// Print either JSON or the text report.
fn emit<T: serde::Serialize>(
    output: OutputArgs,
    value: &T,
    text: impl Fn(&T) -> String,
) -> Result<(), AppError> {
    if output.json {
        println!("{}", crate::report::to_json(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IngestionStatus;

    fn result(status: IngestionStatus) -> IngestionResult {
        IngestionResult {
            status,
            records_added: 0,
            documents_examined: 0,
            message: "Error loading data: no data found in archive".to_string(),
        }
    }

    #[test]
    fn error_result_exits_with_no_data_in_both_output_modes() {
        for json in [false, true] {
            let err = finish_ingestion(&result(IngestionStatus::Error), json).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_NO_DATA);
        }
    }

    #[test]
    fn success_result_exits_cleanly_in_both_output_modes() {
        for json in [false, true] {
            assert!(finish_ingestion(&result(IngestionStatus::Success), json).is_ok());
        }
    }
}
