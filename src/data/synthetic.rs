//! Synthetic H.8-style releases.
//!
//! Used by `bankpulse demo` to exercise the full ingestion path offline, and by
//! tests that need a real archive. Series follow a log random walk with drift
//! plus occasional jump shocks, so the anomaly detector has something to find.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::io::{Cursor, Write};

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{AppError, EXIT_CONFIG, EXIT_IO};

/// Name of the data document inside a synthetic archive.
pub const DATA_DOCUMENT: &str = "H8_data.xml";
/// Structure document; present so the data-document filter has something to skip.
pub const STRUCTURE_DOCUMENT: &str = "H8_struct.xml";

/// One series ready to be written into a release document.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSeries {
    pub code: String,
    pub label: String,
    pub points: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub weeks: usize,
    pub seed: u64,
    /// First observation date; subsequent points are weekly.
    pub start: NaiveDate,
    /// Probability of a jump shock in any given week.
    pub jump_prob: f64,
    /// Jump size in multiples of the weekly volatility.
    pub jump_k: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            weeks: 156,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2022, 1, 5).unwrap_or_default(),
            jump_prob: 0.01,
            jump_k: 6.0,
        }
    }
}

struct Template {
    code: &'static str,
    label: &'static str,
    /// Starting level, millions of dollars.
    level: f64,
    /// Weekly log drift.
    drift: f64,
    /// Weekly log volatility.
    vol: f64,
}

const TEMPLATES: &[Template] = &[
    Template { code: "H8/H8/B1020NCBAM", label: "Commercial and industrial loans, all commercial banks", level: 2_750_000.0, drift: 0.0008, vol: 0.002 },
    Template { code: "H8/H8/B1020NLGAM", label: "Commercial and industrial loans, large domestically chartered commercial banks", level: 1_450_000.0, drift: 0.0007, vol: 0.0025 },
    Template { code: "H8/H8/B1020NSMAM", label: "Commercial and industrial loans, small domestically chartered commercial banks", level: 780_000.0, drift: 0.0010, vol: 0.002 },
    Template { code: "H8/H8/B1026NLGAM", label: "Real estate loans, large domestically chartered commercial banks", level: 2_500_000.0, drift: 0.0006, vol: 0.0015 },
    Template { code: "H8/H8/B1026NSMAM", label: "Real estate loans, small domestically chartered commercial banks", level: 2_900_000.0, drift: 0.0009, vol: 0.0012 },
    Template { code: "H8/H8/B1029NCBAM", label: "Consumer loans: credit cards and other revolving plans, all commercial banks", level: 1_000_000.0, drift: 0.0012, vol: 0.004 },
    Template { code: "H8/H8/B1058NCBAM", label: "Deposits, all commercial banks", level: 17_500_000.0, drift: 0.0003, vol: 0.003 },
    Template { code: "H8/H8/B1058NFRAM", label: "Deposits, foreign-related institutions", level: 1_300_000.0, drift: 0.0002, vol: 0.008 },
    Template { code: "H8/H8/B1048NCBAM", label: "Cash assets: reserves held at Federal Reserve Banks, all commercial banks", level: 3_200_000.0, drift: -0.0004, vol: 0.012 },
    Template { code: "H8/H8/B1001NFRAM", label: "Loans and leases in bank credit, foreign-related institutions", level: 1_100_000.0, drift: 0.0005, vol: 0.003 },
    Template { code: "H8/H8/B1002NCBAM", label: "Securities in bank credit, all commercial banks", level: 5_300_000.0, drift: -0.0002, vol: 0.002 },
];

/// Generate every template series for the configured horizon.
pub fn generate_series(config: &SyntheticConfig) -> Result<Vec<SyntheticSeries>, AppError> {
    if config.weeks == 0 {
        return Err(AppError::new(EXIT_CONFIG, "Synthetic horizon must be at least one week."));
    }
    if !(0.0..1.0).contains(&config.jump_prob) || !(config.jump_k.is_finite() && config.jump_k > 0.0) {
        return Err(AppError::new(EXIT_CONFIG, "Invalid jump settings."));
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Noise distribution error: {e}")))?;

    let series = TEMPLATES
        .iter()
        .map(|t| {
            let mut rng = StdRng::seed_from_u64(series_seed(config.seed, t.code));
            let mut log_level = t.level.ln();
            let points = (0..config.weeks)
                .map(|week| {
                    let date = config.start + Duration::weeks(week as i64);
                    if week > 0 {
                        let z: f64 = normal.sample(&mut rng);
                        let jump = if rng.gen_bool(config.jump_prob) {
                            if rng.gen_bool(0.5) { config.jump_k } else { -config.jump_k }
                        } else {
                            0.0
                        };
                        log_level += t.drift + t.vol * (z + jump);
                    }
                    // Published to one decimal, in millions.
                    (date, (log_level.exp() * 10.0).round() / 10.0)
                })
                .collect();
            SyntheticSeries {
                code: t.code.to_string(),
                label: t.label.to_string(),
                points,
            }
        })
        .collect();

    Ok(series)
}

fn series_seed(seed: u64, code: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    code.hash(&mut hasher);
    hasher.finish()
}

/// Render series as an SDMX-style compact data document.
pub fn render_data_document(series: &[SyntheticSeries]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(concat!(
        r#"<message:MessageGroup xmlns:message="http://www.SDMX.org/resources/SDMXML/schemas/v1_0/message" "#,
        r#"xmlns:common="http://www.SDMX.org/resources/SDMXML/schemas/v1_0/common" "#,
        r#"xmlns:frb="http://www.federalreserve.gov/structure/compact/common" "#,
        r#"xmlns:kf="http://www.federalreserve.gov/structure/compact/H8_H8">"#,
        "\n",
    ));
    out.push_str("<message:Header><message:ID>H8</message:ID><message:Test>true</message:Test></message:Header>\n");
    out.push_str("<frb:DataSet id=\"H8\">\n");

    for s in series {
        let _ = writeln!(out, "<kf:Series SERIES_NAME=\"{}\" UNIT=\"Currency\" UNIT_MULT=\"1000000\">", xml_escape(&s.code));
        out.push_str("<frb:Annotations><common:Annotation>");
        out.push_str("<common:AnnotationType>Short Description</common:AnnotationType>");
        let _ = write!(out, "<common:AnnotationText>{}</common:AnnotationText>", xml_escape(&s.label));
        out.push_str("</common:Annotation></frb:Annotations>\n");
        for (date, value) in &s.points {
            let _ = writeln!(
                out,
                "<frb:Obs TIME_PERIOD=\"{}\" OBS_VALUE=\"{value}\" OBS_STATUS=\"A\"/>",
                date.format("%Y-%m-%d")
            );
        }
        out.push_str("</kf:Series>\n");
    }

    out.push_str("</frb:DataSet>\n</message:MessageGroup>\n");
    out
}

fn render_structure_document() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        "\n",
        r#"<message:Structure xmlns:message="http://www.SDMX.org/resources/SDMXML/schemas/v1_0/message">"#,
        "<message:KeyFamilies/></message:Structure>\n",
    )
    .to_string()
}

/// Build a complete release archive (data + structure documents).
pub fn build_release(series: &[SyntheticSeries]) -> Result<Vec<u8>, AppError> {
    zip_documents(&[
        (DATA_DOCUMENT, render_data_document(series)),
        (STRUCTURE_DOCUMENT, render_structure_document()),
    ])
}

/// Write named documents into an in-memory ZIP, in the given order.
pub fn zip_documents(documents: &[(&str, String)]) -> Result<Vec<u8>, AppError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in documents {
        zip.start_file(*name, SimpleFileOptions::default())
            .map_err(|e| AppError::new(EXIT_IO, format!("Failed to add {name} to archive: {e}")))?;
        zip.write_all(content.as_bytes())
            .map_err(|e| AppError::new(EXIT_IO, format!("Failed to write {name}: {e}")))?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to finish archive: {e}")))?;
    Ok(cursor.into_inner())
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
