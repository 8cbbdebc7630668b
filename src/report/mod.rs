//! Reporting utilities: formatted terminal output and JSON printing.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::error::{AppError, EXIT_IO};

/// Pretty JSON for `--json` output.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(EXIT_IO, format!("Failed to encode JSON: {e}")))
}
