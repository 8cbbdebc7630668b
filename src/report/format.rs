//! Formatted terminal output for every command.
//!
//! We keep formatting code in one place so:
//! - the ingestion and analytics code stays clean and testable
//! - output changes are localized

use crate::analytics::{AnomalyRow, ClusterOutcome, DataSummary, FlliOutcome, GrowthReport, StatusReport};
use crate::domain::{IngestionResult, Observation};

const NAME_WIDTH: usize = 48;

pub fn format_ingestion(result: &IngestionResult) -> String {
    let mut out = String::new();
    out.push_str("=== bankpulse - ingestion ===\n");
    out.push_str(&format!("Status: {}\n", result.status));
    out.push_str(&format!("Records: {}\n", result.records_added));
    out.push_str(&format!("Documents examined: {}\n", result.documents_examined));
    out.push_str(&format!("{}\n", result.message));
    out
}

pub fn format_status(report: &StatusReport) -> String {
    let mut out = String::new();
    out.push_str("=== bankpulse - data summary ===\n");

    match &report.summary {
        DataSummary::NoData => out.push_str("No data loaded. Run `bankpulse download` or `bankpulse demo`.\n"),
        DataSummary::Available(s) => {
            if let Some(latest) = report.latest_date {
                out.push_str(&format!("Latest observation: {latest}\n"));
            }
            out.push_str(&format!("Records: {} | series: {}\n", s.total_records, s.series_count));
            out.push_str(&format!("Dates: {} .. {}\n", s.first_date, s.last_date));
            out.push_str(&format!("Asset classes: {}\n", join(&s.asset_classes)));
            out.push_str(&format!("Bank types: {}\n", join(&s.bank_types)));
        }
    }

    out.push_str("\nRecent updates:\n");
    if report.recent_updates.is_empty() {
        out.push_str("  (none)\n");
    }
    for u in &report.recent_updates {
        out.push_str(&format!(
            "  {} {:>8} {}\n",
            u.updated_at.format("%Y-%m-%d %H:%M:%S"),
            u.records_added,
            u.status
        ));
    }
    out
}

pub fn format_series(rows: &[Observation]) -> String {
    let mut out = header(&[("series", NAME_WIDTH, false), ("date", 10, false), ("value", 14, true)]);
    for o in rows {
        push_line(
            &mut out,
            format!("{:<NAME_WIDTH$} {:<10} {:>14.1}", truncate(&o.series_name, NAME_WIDTH), o.date, o.value),
        );
    }
    out.push_str(&format!("{} rows\n", rows.len()));
    out
}

pub fn format_growth(report: &GrowthReport) -> String {
    let mut out = String::new();
    if report.series.is_empty() {
        out.push_str("No series matched.\n");
        return out;
    }
    out.push_str("Series:\n");
    for s in &report.series {
        out.push_str(&format!("- {s}\n"));
    }
    out.push('\n');

    out.push_str(&header(&[
        ("series", NAME_WIDTH, false),
        ("date", 10, false),
        ("value", 14, true),
        ("wow %", 9, true),
        ("mom %", 9, true),
        ("yoy %", 9, true),
    ]));
    for r in &report.rows {
        let o = &r.observation;
        push_line(
            &mut out,
            format!(
                "{:<NAME_WIDTH$} {:<10} {:>14.1} {:>9} {:>9} {:>9}",
                truncate(&o.series_name, NAME_WIDTH),
                o.date,
                o.value,
                fmt_pct(r.wow_change),
                fmt_pct(r.mom_change),
                fmt_pct(r.yoy_change),
            ),
        );
    }
    out
}

pub fn format_anomalies(rows: &[AnomalyRow], threshold: f64) -> String {
    let mut out = format!("Anomalies (|z| > {threshold}): {}\n", rows.len());
    if rows.is_empty() {
        return out;
    }
    out.push_str(&header(&[("series", NAME_WIDTH, false), ("date", 10, false), ("value", 14, true), ("z", 8, true)]));
    for r in rows {
        let o = &r.observation;
        push_line(
            &mut out,
            format!(
                "{:<NAME_WIDTH$} {:<10} {:>14.1} {:>8}",
                truncate(&o.series_name, NAME_WIDTH),
                o.date,
                o.value,
                r.z_score.map(|z| format!("{z:.2}")).unwrap_or_default(),
            ),
        );
    }
    out
}

pub fn format_flli(outcome: &FlliOutcome) -> String {
    match outcome {
        FlliOutcome::NoData => "FLLI: no data in range.\n".to_string(),
        FlliOutcome::Calculated(s) => {
            let mut out = String::new();
            out.push_str(&format!("FLLI: {:.2}\n", s.flli_score));
            out.push_str(&format!("- loan momentum     : {:.3}\n", s.loan_momentum));
            out.push_str(&format!("- deposit volatility: {:.3}\n", s.deposit_volatility));
            out.push_str(&format!("- reserve trend     : {:.3}\n", s.reserve_trend));
            out
        }
    }
}

pub fn format_clusters(outcome: &ClusterOutcome) -> String {
    match outcome {
        ClusterOutcome::NoData => "Clusters: no data.\n".to_string(),
        ClusterOutcome::InsufficientData { series_count, requested } => {
            format!("Clusters: {series_count} series is not enough for {requested} clusters.\n")
        }
        ClusterOutcome::Success { n_clusters, clusters } => {
            let mut out = format!("Clusters: {n_clusters}\n");
            for c in clusters {
                out.push_str(&format!("\n[{}] {} series\n", c.cluster_id, c.series_count));
                for name in &c.series_names {
                    out.push_str(&format!("  - {name}\n"));
                }
                if c.series_count > c.series_names.len() {
                    out.push_str(&format!("  ... and {} more\n", c.series_count - c.series_names.len()));
                }
            }
            out
        }
    }
}

/// Column titles followed by a dashed rule. `(title, width, right_aligned)`.
fn header(columns: &[(&str, usize, bool)]) -> String {
    let titles: Vec<String> = columns
        .iter()
        .map(|&(t, w, right)| if right { format!("{t:>w$}") } else { format!("{t:<w$}") })
        .collect();
    let rules: Vec<String> = columns.iter().map(|&(_, w, _)| "-".repeat(w)).collect();

    let mut out = String::new();
    push_line(&mut out, titles.join(" "));
    push_line(&mut out, rules.join(" "));
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".to_string())
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    parts.join(", ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{ClusterSummary, FlliScore};
    use crate::domain::IngestionStatus;

    #[test]
    fn truncate_marks_cut_labels() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
        assert_eq!(truncate("abcdefghij", 5).chars().count(), 5);
    }

    #[test]
    fn ingestion_summary_shows_status_and_counts() {
        let text = format_ingestion(&IngestionResult {
            status: IngestionStatus::Success,
            records_added: 12,
            documents_examined: 1,
            message: "Successfully loaded 12 records".to_string(),
        });
        assert!(text.contains("Status: success"));
        assert!(text.contains("Records: 12"));
    }

    #[test]
    fn ingestion_error_keeps_the_line_label_capitalized() {
        let text = format_ingestion(&IngestionResult {
            status: IngestionStatus::Error,
            records_added: 0,
            documents_examined: 0,
            message: "Error loading data: timed out".to_string(),
        });
        assert!(text.lines().any(|l| l == "Status: error"));
        assert!(text.contains("Records: 0"));
    }

    #[test]
    fn cluster_listing_notes_hidden_members() {
        let text = format_clusters(&ClusterOutcome::Success {
            n_clusters: 1,
            clusters: vec![ClusterSummary {
                cluster_id: 0,
                series_count: 12,
                series_names: vec!["a".to_string(), "b".to_string()],
            }],
        });
        assert!(text.contains("[0] 12 series"));
        assert!(text.contains("... and 10 more"));
    }

    #[test]
    fn flli_prints_components() {
        let text = format_flli(&FlliOutcome::Calculated(FlliScore {
            flli_score: 1.25,
            loan_momentum: 0.031,
            deposit_volatility: 0.002,
            reserve_trend: 0.0,
        }));
        assert!(text.starts_with("FLLI: 1.25"));
        assert!(text.contains("loan momentum     : 0.031"));
    }

    #[test]
    fn table_lines_have_no_trailing_spaces() {
        let text = format_series(&[]);
        assert!(text.lines().all(|l| l == l.trim_end()));
        assert!(text.ends_with("0 rows\n"));
    }
}
