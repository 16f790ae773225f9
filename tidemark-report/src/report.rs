//! The two report flows.
//!
//! Both load a reference table, search every value of its `Source`
//! column, and attach per-domain match counts. They differ in where the
//! counts go and in how an absent count is rendered:
//!
//! - the one-shot summary keeps unmatched domains null (empty cells),
//!   so downstream consumers can tell "no matches" from "count of 0";
//! - the tracking table zero-fills, because a time series wants a
//!   numeric value in every cell.
//!
//! That asymmetry is intentional. Do not unify the two.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use tidemark_twitter::TwitterApi;
use tracing::info;

use crate::collect::collect_posts;
use crate::table::Table;
use crate::ReportError;

/// Column name of the query terms in the reference table.
pub const SOURCE_COLUMN: &str = "Source";

/// Layout of the tracking column name, the run's UTC timestamp.
const TRACKING_COLUMN_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Full collection pass plus a standalone summary file.
///
/// Writes every collected row to `raw_output`, then left-joins the
/// per-domain counts onto the reference table as two new columns:
/// `domain` (the join key, echoing `Source` where a match exists) and
/// `volume`. Reference rows without matches keep both cells empty.
/// Returns the summary table after writing it to `summary_output`.
pub async fn popularity_report(
    api: &TwitterApi,
    reference_path: &Path,
    raw_output: &Path,
    summary_output: &Path,
) -> Result<Table, ReportError> {
    let started = Utc::now();
    info!(
        reference = %reference_path.display(),
        started = %started.to_rfc3339(),
        "popularity report starting"
    );

    let mut reference = Table::read_csv_path(reference_path)?;
    let source_idx = source_index(&reference, reference_path)?;
    let domains: Vec<String> = reference
        .rows
        .iter()
        .map(|row| row[source_idx].clone())
        .collect();

    let raw = collect_posts(api, &domains, false).await;
    raw.write_csv_path_atomic(raw_output)?;
    info!(
        path = %raw_output.display(),
        rows = raw.rows.len(),
        "raw rows written"
    );

    let counts = count_by_domain(&raw);

    let mut domain_col = Vec::with_capacity(reference.rows.len());
    let mut volume_col = Vec::with_capacity(reference.rows.len());
    for row in &reference.rows {
        match counts.get(row[source_idx].as_str()) {
            Some(n) => {
                domain_col.push(row[source_idx].clone());
                volume_col.push(n.to_string());
            }
            None => {
                domain_col.push(String::new());
                volume_col.push(String::new());
            }
        }
    }
    reference.push_column("domain", domain_col);
    reference.push_column("volume", volume_col);

    reference.write_csv_path_atomic(summary_output)?;

    let finished = Utc::now();
    info!(
        path = %summary_output.display(),
        rows = reference.rows.len(),
        finished = %finished.to_rfc3339(),
        elapsed_ms = (finished - started).num_milliseconds(),
        "popularity report finished"
    );
    Ok(reference)
}

/// Single-page collection pass that grows the reference table in place.
///
/// Appends one column named by the run's UTC timestamp, holding each
/// domain's match count as a float and `0.0` where nothing matched,
/// then atomically rewrites `reference_path`. Each run adds one column,
/// so the file accumulates a time series. Returns the updated table.
pub async fn tracking_report(
    api: &TwitterApi,
    reference_path: &Path,
) -> Result<Table, ReportError> {
    let started = Utc::now();
    info!(
        reference = %reference_path.display(),
        started = %started.to_rfc3339(),
        "tracking report starting"
    );

    let mut reference = Table::read_csv_path(reference_path)?;
    let source_idx = source_index(&reference, reference_path)?;
    let domains: Vec<String> = reference
        .rows
        .iter()
        .map(|row| row[source_idx].clone())
        .collect();

    let raw = collect_posts(api, &domains, true).await;
    let counts = count_by_domain(&raw);

    let column_name = started.format(TRACKING_COLUMN_FORMAT).to_string();
    let values: Vec<String> = reference
        .rows
        .iter()
        .map(|row| match counts.get(row[source_idx].as_str()) {
            Some(n) => format!("{:.1}", *n as f64),
            None => "0.0".to_string(),
        })
        .collect();
    reference.push_column(&column_name, values);

    reference.write_csv_path_atomic(reference_path)?;

    let finished = Utc::now();
    info!(
        column = %column_name,
        rows = reference.rows.len(),
        finished = %finished.to_rfc3339(),
        elapsed_ms = (finished - started).num_milliseconds(),
        "tracking report finished"
    );
    Ok(reference)
}

fn source_index(reference: &Table, path: &Path) -> Result<usize, ReportError> {
    reference
        .column_index(SOURCE_COLUMN)
        .ok_or_else(|| ReportError::MissingColumn {
            path: path.to_path_buf(),
            column: SOURCE_COLUMN.to_string(),
        })
}

/// Group-count raw rows by their `domain` cell. Domains with no rows are
/// simply absent from the map.
fn count_by_domain(raw: &Table) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    if let Some(idx) = raw.column_index("domain") {
        for row in &raw.rows {
            *counts.entry(row[idx].clone()).or_insert(0usize) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::RAW_COLUMNS;

    fn raw_with_domains(domains: &[&str]) -> Table {
        let mut t = Table::new(RAW_COLUMNS.iter().map(|c| c.to_string()).collect());
        for (i, d) in domains.iter().enumerate() {
            t.rows.push(vec![
                d.to_string(),
                format!("{i}"),
                "2018-10-10T20:19:24+00:00".to_string(),
                "{}".to_string(),
            ]);
        }
        t
    }

    #[test]
    fn counts_group_by_domain_value() {
        let counts = count_by_domain(&raw_with_domains(&["a", "b", "a", "a"]));
        assert_eq!(counts.get("a"), Some(&3));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.get("c"), None);
    }

    #[test]
    fn empty_raw_table_counts_nothing() {
        let counts = count_by_domain(&raw_with_domains(&[]));
        assert!(counts.is_empty());
    }

    #[test]
    fn missing_source_column_is_reported_with_path() {
        let reference = Table::new(vec!["Name".to_string()]);
        let err = source_index(&reference, Path::new("ref.csv")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ref.csv"));
        assert!(message.contains("Source"));
    }
}
