//! Export analytics results to files.
//!
//! CSV is meant to be easy to consume in spreadsheets.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analytics::GrowthRow;
use crate::error::{AppError, EXIT_IO};

pub const GROWTH_CSV_HEADER: &str = "series_name,date,value,bank_type,asset_class,wow_change,mom_change,yoy_change";

/// Write growth-rate rows to a CSV file. Absent changes are empty cells.
pub fn write_growth_csv(path: &Path, rows: &[GrowthRow]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{GROWTH_CSV_HEADER}")
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to write export CSV header: {e}")))?;

    for r in rows {
        let o = &r.observation;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            csv_field(&o.series_name),
            o.date,
            o.value,
            o.bank_type,
            o.asset_class,
            opt_cell(r.wow_change),
            opt_cell(r.mom_change),
            opt_cell(r.yoy_change),
        )
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to flush export CSV '{}': {e}", path.display())))
}

fn opt_cell(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Quote a field when it contains a delimiter, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
