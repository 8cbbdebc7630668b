//! Release archive parsing and normalization.
//!
//! This module turns the raw ZIP bytes of an H.8 release into a clean,
//! deduplicated list of classified `Observation`s.
//!
//! Design goals:
//! - **Document-level failures are isolated**: a malformed document is skipped
//!   and logged; the call only fails when no data document parsed at all
//! - **Observation-level validation**: a missing period, a missing value or a
//!   non-numeric value skips that one observation, nothing more
//! - **Deterministic output**: documents are taken in archive order and the
//!   first occurrence of a `(series_name, date)` pair wins

use std::collections::HashSet;
use std::io::{Cursor, Read};

use chrono::NaiveDate;
use rayon::prelude::*;
use roxmltree::{Document, ParsingOptions};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::domain::Observation;
use crate::error::IngestError;
use crate::io::xml::LocalNameExt;

const SERIES: &str = "Series";
const ANNOTATION: &str = "Annotation";
const ANNOTATION_TYPE: &str = "AnnotationType";
const ANNOTATION_TEXT: &str = "AnnotationText";
const OBS: &str = "Obs";

const SERIES_ID_ATTR: &str = "SERIES_NAME";
const PERIOD_ATTR: &str = "TIME_PERIOD";
const VALUE_ATTR: &str = "OBS_VALUE";

/// Annotation types whose text is used as the display label.
const LABEL_ANNOTATIONS: [&str; 2] = ["Short Description", "Long Description"];

/// Label used when a series carries no identifier at all.
pub const UNKNOWN_SERIES: &str = "Unknown";

/// Parse output: normalized observations plus document bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ParsedArchive {
    pub observations: Vec<Observation>,
    /// Data documents selected from the archive.
    pub documents_examined: usize,
    /// Selected documents that were skipped as malformed.
    pub documents_failed: usize,
}

/// Whether an archive member holds observation data (as opposed to structure
/// or metadata documents).
pub fn is_data_document(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xml") && lower.contains("data")
}

/// Open a release archive and parse every data document in it.
pub fn parse_archive(bytes: &[u8]) -> Result<ParsedArchive, IngestError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| IngestError::Archive(e.to_string()))?;

    let mut documents: Vec<(String, Vec<u8>)> = Vec::new();
    for idx in 0..archive.len() {
        let mut file = archive
            .by_index(idx)
            .map_err(|e| IngestError::Archive(e.to_string()))?;
        if file.is_dir() || !is_data_document(file.name()) {
            debug!(member = file.name(), "Ignoring archive member");
            continue;
        }
        let name = file.name().to_string();
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)
            .map_err(|e| IngestError::Archive(format!("failed to read {name}: {e}")))?;
        documents.push((name, buf));
    }
    info!(documents = documents.len(), "Found XML data documents in archive");

    // Documents are independent; `collect` keeps archive order.
    let results: Vec<Result<Vec<Observation>, IngestError>> = documents
        .par_iter()
        .map(|(name, buf)| parse_document_bytes(name, buf))
        .collect();

    let mut rows = Vec::new();
    let mut failed = 0usize;
    let mut first_error = None;
    for ((name, _), result) in documents.iter().zip(results) {
        match result {
            Ok(parsed) => {
                debug!(document = %name, rows = parsed.len(), "Parsed document");
                rows.extend(parsed);
            }
            Err(err) => {
                warn!(document = %name, error = %err, "Skipping malformed document");
                failed += 1;
                first_error.get_or_insert(err);
            }
        }
    }

    if let Some(err) = first_error.filter(|_| failed == documents.len()) {
        return Err(err);
    }

    let observations = dedupe_first_seen(rows);
    info!(rows = observations.len(), failed, "Parsed release archive");

    Ok(ParsedArchive {
        observations,
        documents_examined: documents.len(),
        documents_failed: failed,
    })
}

fn parse_document_bytes(name: &str, bytes: &[u8]) -> Result<Vec<Observation>, IngestError> {
    let text = std::str::from_utf8(bytes).map_err(|e| IngestError::Format {
        document: name.to_string(),
        message: format!("not valid UTF-8: {e}"),
    })?;
    parse_document(name, text)
}

/// Parse one data document into classified observations.
pub fn parse_document(name: &str, text: &str) -> Result<Vec<Observation>, IngestError> {
    let text = text.trim_start_matches('\u{feff}');
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options).map_err(|e| IngestError::Format {
        document: name.to_string(),
        message: e.to_string(),
    })?;

    let mut out = Vec::new();
    let mut series_count = 0usize;
    let mut skipped = 0usize;

    for series in doc.root().find_all(SERIES) {
        series_count += 1;
        let label = series_label(series);

        for obs in series.find_all(OBS) {
            let parsed = obs
                .attr(PERIOD_ATTR)
                .and_then(parse_period)
                .zip(obs.attr(VALUE_ATTR).and_then(parse_value));
            match parsed {
                Some((date, value)) => out.push(Observation::classified(label.clone(), date, value)),
                None => skipped += 1,
            }
        }
    }

    debug!(document = name, series = series_count, rows = out.len(), skipped, "Parsed series");
    Ok(out)
}

/// Display label for a series: the first short/long description annotation,
/// else the series identifier, else [`UNKNOWN_SERIES`].
fn series_label(series: roxmltree::Node<'_, '_>) -> String {
    for annotation in series.find_all(ANNOTATION) {
        let (Some(kind), Some(text)) = (
            annotation.find_first(ANNOTATION_TYPE),
            annotation.find_first(ANNOTATION_TEXT),
        ) else {
            continue;
        };
        let kind = kind.text_content();
        if LABEL_ANNOTATIONS.iter().any(|l| kind.contains(l)) {
            let text = text.text_content();
            if !text.is_empty() {
                return text;
            }
        }
    }

    series
        .attr(SERIES_ID_ATTR)
        .unwrap_or(UNKNOWN_SERIES)
        .to_string()
}

/// `YYYY-MM-DD`, or `YYYY-MM` mapped to the first of the month.
fn parse_period(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d"))
        .ok()
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Drop repeated `(series_name, date)` pairs, keeping the first occurrence.
pub fn dedupe_first_seen(rows: Vec<Observation>) -> Vec<Observation> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|o| seen.insert((o.series_name.clone(), o.date)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::zip_documents;
    use crate::domain::{AssetClass, BankType};

    const DOC_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<message:MessageGroup xmlns:message="urn:sdmx:message" xmlns:common="urn:sdmx:common" xmlns:kf="urn:frb:h8">
  <kf:DataSet>
    <kf:Series SERIES_NAME="H8/H8/B1020NCBAM">
      <kf:Annotations>
        <common:Annotation>
          <common:AnnotationType>Unit</common:AnnotationType>
          <common:AnnotationText>Millions of dollars</common:AnnotationText>
        </common:Annotation>
        <common:Annotation>
          <common:AnnotationType>Short Description</common:AnnotationType>
          <common:AnnotationText>Commercial and industrial loans, small domestically chartered banks</common:AnnotationText>
        </common:Annotation>
      </kf:Annotations>
      <kf:Obs TIME_PERIOD="2024-01-03" OBS_VALUE="100.5"/>
      <kf:Obs TIME_PERIOD="2024-01-10" OBS_VALUE="NC"/>
      <kf:Obs TIME_PERIOD="2024-01-17"/>
      <kf:Obs OBS_VALUE="7"/>
      <kf:Obs TIME_PERIOD="2024-01-24" OBS_VALUE="101.25"/>
    </kf:Series>
    <kf:Series SERIES_NAME="H8/H8/B3000NCBAM">
      <kf:Obs TIME_PERIOD="2024-01" OBS_VALUE="5"/>
    </kf:Series>
    <kf:Series>
      <kf:Obs TIME_PERIOD="2024-01-03" OBS_VALUE="1"/>
    </kf:Series>
  </kf:DataSet>
</message:MessageGroup>"#;

    // Same content shape under a different namespace URI and prefix.
    const DOC_B: &str = r#"<ns9:DataSet xmlns:ns9="http://example.org/other" xmlns:c="http://example.org/common">
  <ns9:Series SERIES_NAME="H8/H8/B1020NCBAM">
    <c:Annotation>
      <c:AnnotationType>Long Description</c:AnnotationType>
      <c:AnnotationText>Commercial and industrial loans, small domestically chartered banks</c:AnnotationText>
    </c:Annotation>
    <ns9:Obs TIME_PERIOD="2024-01-03" OBS_VALUE="999"/>
    <ns9:Obs TIME_PERIOD="2024-01-31" OBS_VALUE="102"/>
  </ns9:Series>
</ns9:DataSet>"#;

    #[test]
    fn data_document_filter() {
        assert!(is_data_document("H8_data.xml"));
        assert!(is_data_document("FRB_H8/H8_DATA.XML"));
        assert!(!is_data_document("H8_struct.xml"));
        assert!(!is_data_document("H8_data.csv"));
    }

    #[test]
    fn document_parse_skips_bad_observations_and_labels_series() {
        let rows = parse_document("H8_data.xml", DOC_A).unwrap();
        assert_eq!(rows.len(), 4);

        let label = "Commercial and industrial loans, small domestically chartered banks";
        assert_eq!(rows[0].series_name, label);
        assert_eq!(rows[0].value, 100.5);
        assert_eq!(rows[0].bank_type, BankType::Small);
        assert_eq!(rows[0].asset_class, AssetClass::CommercialIndustrial);
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2024, 1, 24).unwrap());

        // No annotation: identifier is the label; monthly period maps to the 1st.
        assert_eq!(rows[2].series_name, "H8/H8/B3000NCBAM");
        assert_eq!(rows[2].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        assert_eq!(rows[3].series_name, UNKNOWN_SERIES);
    }

    #[test]
    fn archive_parse_spans_namespaces_and_keeps_first_duplicate() {
        let bytes = zip_documents(&[
            ("H8_data.xml", DOC_A.to_string()),
            ("H8_struct.xml", "<not-even-parsed".to_string()),
            ("H8_data_2.xml", DOC_B.to_string()),
        ])
        .unwrap();

        let parsed = parse_archive(&bytes).unwrap();
        assert_eq!(parsed.documents_examined, 2);
        assert_eq!(parsed.documents_failed, 0);
        // 4 from A + 1 new from B (the 2024-01-03 duplicate keeps A's value).
        assert_eq!(parsed.observations.len(), 5);
        let jan3: Vec<_> = parsed
            .observations
            .iter()
            .filter(|o| o.date == NaiveDate::from_ymd_opt(2024, 1, 3).unwrap() && o.series_name.starts_with("Commercial"))
            .collect();
        assert_eq!(jan3.len(), 1);
        assert_eq!(jan3[0].value, 100.5);
    }

    #[test]
    fn malformed_document_is_skipped_when_another_succeeds() {
        let bytes = zip_documents(&[
            ("a_data.xml", "<Series><Obs></Series>".to_string()),
            ("b_data.xml", DOC_B.to_string()),
        ])
        .unwrap();
        let parsed = parse_archive(&bytes).unwrap();
        assert_eq!(parsed.documents_failed, 1);
        assert_eq!(parsed.observations.len(), 2);
    }

    #[test]
    fn malformed_only_document_is_a_format_error() {
        let bytes = zip_documents(&[("only_data.xml", "<Series>".to_string())]).unwrap();
        let err = parse_archive(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::Format { ref document, .. } if document == "only_data.xml"));
    }

    #[test]
    fn non_zip_bytes_are_an_archive_error() {
        let err = parse_archive(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, IngestError::Archive(_)));
    }

    #[test]
    fn archive_without_data_documents_is_empty_not_an_error() {
        let bytes = zip_documents(&[("README.txt", "hello".to_string())]).unwrap();
        let parsed = parse_archive(&bytes).unwrap();
        assert_eq!(parsed.documents_examined, 0);
        assert!(parsed.observations.is_empty());
    }

    #[test]
    fn value_parsing_rejects_non_finite() {
        assert_eq!(parse_value(" 12.5 "), Some(12.5));
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value(""), None);
    }
}
