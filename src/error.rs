//! Error types.
//!
//! `AppError` is what crosses the process boundary (it carries the exit code).
//! The narrower enums below describe failures inside one subsystem and convert
//! into `AppError` so command handlers can use `?` throughout.

use thiserror::Error;

/// Exit code for configuration, usage and export problems.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code when the store does not hold enough data for a command.
pub const EXIT_NO_DATA: u8 = 3;
/// Exit code for network and database failures.
pub const EXIT_IO: u8 = 4;

#[derive(Clone, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

/// Failures of the observation store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored date '{0}' is not a valid YYYY-MM-DD date")]
    BadDate(String),

    #[error("stored label '{0}' is not a known category")]
    BadLabel(String),
}

/// Failures of one ingestion cycle.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("network request failed: {0}")]
    Network(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("failed to open archive: {0}")]
    Archive(String),

    #[error("malformed XML in {document}: {message}")]
    Format { document: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of an analytics request.
///
/// Empty or undersized inputs are not errors; they are reported through the
/// status of each result type.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::new(EXIT_IO, err.to_string())
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Format { .. } => AppError::new(EXIT_NO_DATA, err.to_string()),
            other => AppError::new(EXIT_IO, other.to_string()),
        }
    }
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidArgument(msg) => AppError::new(EXIT_CONFIG, msg),
            AnalyticsError::Store(e) => e.into(),
        }
    }
}
