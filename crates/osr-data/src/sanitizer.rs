//! Numeric coercion of the `Amount` column.
//!
//! Every row whose amount cannot be read as a finite number is dropped. The
//! drop is reported back to the caller instead of happening silently.

use std::collections::BTreeMap;

use osr_core::models::{CombinedDataset, RawDataset, RawRecord, Record};
use serde::Serialize;
use tracing::{debug, warn};

/// A row removed because its amount was missing or non-numeric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRow {
    pub year: i32,
    pub line: usize,
    pub description: String,
    /// The original cell text, `None` when the cell was empty.
    pub raw_amount: Option<String>,
}

/// Sanitized dataset plus every row that was dropped on the way.
#[derive(Debug, Clone)]
pub struct SanitizeReport {
    pub dataset: CombinedDataset,
    pub dropped: Vec<DroppedRow>,
}

impl SanitizeReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Dropped rows per year, ascending by year.
    pub fn dropped_by_year(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.dropped {
            *counts.entry(row.year).or_insert(0) += 1;
        }
        counts
    }
}

/// Coerce every amount to `f64`, dropping rows that fail.
pub fn sanitize(raw: RawDataset) -> SanitizeReport {
    let mut records = Vec::with_capacity(raw.records.len());
    let mut dropped = Vec::new();

    for row in raw.records {
        match row.amount.as_deref().and_then(parse_amount) {
            Some(amount) => records.push(into_record(row, amount)),
            None => {
                debug!(
                    "Dropping {} line {}: invalid amount {:?}",
                    row.year, row.line, row.amount
                );
                dropped.push(DroppedRow {
                    year: row.year,
                    line: row.line,
                    description: row.description,
                    raw_amount: row.amount,
                });
            }
        }
    }

    if !dropped.is_empty() {
        warn!(
            "Dropped {} rows with a missing or non-numeric Amount ({} kept)",
            dropped.len(),
            records.len()
        );
    }

    SanitizeReport {
        dataset: CombinedDataset::new(raw.columns, records),
        dropped,
    }
}

/// Lenient numeric coercion: surrounding whitespace is ignored; empty text,
/// non-numbers and non-finite values are missing.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

fn into_record(row: RawRecord, amount: f64) -> Record {
    Record {
        year: row.year,
        line: row.line,
        description: row.description,
        amount,
        extra: row.extra,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(year: i32, line: usize, description: &str, amount: Option<&str>) -> RawRecord {
        RawRecord {
            year,
            line,
            description: description.to_string(),
            amount: amount.map(str::to_string),
            extra: BTreeMap::new(),
        }
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn test_parse_amount_plain_numbers() {
        assert_eq!(parse_amount("100"), Some(100.0));
        assert_eq!(parse_amount(" 12.5 "), Some(12.5));
        assert_eq!(parse_amount("-3"), Some(-3.0));
        assert_eq!(parse_amount("1e3"), Some(1000.0));
    }

    #[test]
    fn test_parse_amount_rejects_non_numeric() {
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("1,000"), None);
        assert_eq!(parse_amount("K100"), None);
    }

    #[test]
    fn test_parse_amount_rejects_non_finite() {
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("-infinity"), None);
    }

    // ── sanitize ──────────────────────────────────────────────────────────────

    #[test]
    fn test_sanitize_drops_invalid_rows_and_reports_them() {
        let dataset = RawDataset {
            columns: vec!["Receipt".to_string()],
            records: vec![
                raw(2021, 2, "Trading License", Some("100")),
                raw(2021, 3, "Signage Fee", Some("N/A")),
                raw(2022, 2, "Trading License", Some("200")),
                raw(2022, 3, "Market Levy", None),
            ],
        };

        let report = sanitize(dataset);

        assert_eq!(report.dataset.len(), 2);
        assert_eq!(report.dataset.columns, vec!["Receipt".to_string()]);
        assert_eq!(report.dropped_count(), 2);
        assert_eq!(report.dropped[0].line, 3);
        assert_eq!(report.dropped[0].raw_amount.as_deref(), Some("N/A"));
        assert!(report.dropped[1].raw_amount.is_none());

        let by_year = report.dropped_by_year();
        assert_eq!(by_year.get(&2021), Some(&1));
        assert_eq!(by_year.get(&2022), Some(&1));
    }

    #[test]
    fn test_sanitize_keeps_order_and_fields() {
        let mut first = raw(2021, 2, "Bus Levy", Some("5"));
        first.extra.insert("Ward".to_string(), "Kapata".to_string());
        let dataset = RawDataset {
            columns: vec!["Ward".to_string()],
            records: vec![first, raw(2021, 3, "Market Levy", Some("7.25"))],
        };

        let report = sanitize(dataset);

        assert_eq!(report.dropped_count(), 0);
        let rows = &report.dataset.records;
        assert_eq!(rows[0].description, "Bus Levy");
        assert_eq!(rows[0].amount, 5.0);
        assert_eq!(rows[0].extra.get("Ward").map(String::as_str), Some("Kapata"));
        assert_eq!(rows[1].amount, 7.25);
    }

    #[test]
    fn test_sanitize_every_amount_finite() {
        let dataset = RawDataset {
            columns: vec![],
            records: vec![
                raw(2021, 2, "A", Some("inf")),
                raw(2021, 3, "B", Some("1")),
                raw(2021, 4, "C", Some("abc")),
            ],
        };
        let report = sanitize(dataset);
        assert!(report.dataset.records.iter().all(|r| r.amount.is_finite()));
        assert_eq!(report.dataset.len(), 1);
    }
}
