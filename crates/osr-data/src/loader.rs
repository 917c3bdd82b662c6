//! Yearly CSV discovery and loading.
//!
//! Looks for one `<year>.csv` per requested year under a data directory and
//! turns each into a [`YearTable`]. A missing file is skipped quietly; a file
//! that exists but cannot be parsed is skipped with a warning naming it. One
//! year's failure never affects the others.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use osr_core::models::{RawRecord, YearTable, AMOUNT_COLUMN, DESCRIPTION_COLUMN, YEAR_COLUMN};
use osr_core::{OsrError, Result};
use serde::Serialize;
use tracing::{debug, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// What happened to one requested year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The file was parsed; `rows` data rows were read.
    Loaded { rows: usize },
    /// No file exists for the year.
    Missing,
    /// The file exists but could not be turned into a table.
    Malformed { reason: String },
}

/// Per-year outcome of a load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub year: i32,
    pub path: PathBuf,
    pub status: SourceStatus,
}

/// Output of [`load_year_tables`]: the parsed tables plus one report per year.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successfully parsed tables, in the order the years were requested.
    pub tables: Vec<YearTable>,
    pub sources: Vec<SourceReport>,
}

impl LoadReport {
    /// User-visible warnings, one per malformed file.
    pub fn warnings(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter_map(|s| match &s.status {
                SourceStatus::Malformed { reason } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn missing_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.status == SourceStatus::Missing)
            .count()
    }

    pub fn malformed_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.status, SourceStatus::Malformed { .. }))
            .count()
    }

    /// Total data rows read across every loaded file.
    pub fn rows_read(&self) -> usize {
        self.tables.iter().map(|t| t.records.len()).sum()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Path of the source file for `year` inside `data_dir`.
pub fn year_source_path(data_dir: &Path, year: i32) -> PathBuf {
    data_dir.join(format!("{year}.csv"))
}

/// Load every available yearly file.
///
/// Years are visited in the order given; a year listed twice is only read
/// once.
pub fn load_year_tables(data_dir: &Path, years: &[i32]) -> LoadReport {
    let mut report = LoadReport::default();
    let mut seen: HashSet<i32> = HashSet::new();

    for &year in years {
        if !seen.insert(year) {
            debug!("Year {} requested more than once; ignoring repeat", year);
            continue;
        }

        let path = year_source_path(data_dir, year);
        if !path.exists() {
            debug!("No source file for {} at {}", year, path.display());
            report.sources.push(SourceReport {
                year,
                path,
                status: SourceStatus::Missing,
            });
            continue;
        }

        match read_year_table(&path, year) {
            Ok(table) => {
                debug!(
                    "File {}: {} rows, {} passthrough columns",
                    path.display(),
                    table.records.len(),
                    table.columns.len()
                );
                report.sources.push(SourceReport {
                    year,
                    path,
                    status: SourceStatus::Loaded {
                        rows: table.records.len(),
                    },
                });
                report.tables.push(table);
            }
            Err(e) => {
                warn!("{}", e);
                report.sources.push(SourceReport {
                    year,
                    path,
                    status: SourceStatus::Malformed {
                        reason: e.to_string(),
                    },
                });
            }
        }
    }

    report
}

/// Parse a single yearly CSV file into a [`YearTable`] tagged with `year`.
///
/// Fails with [`OsrError::MalformedSource`] when the file is empty, is not
/// valid UTF-8 CSV, lacks the `Description` / `Amount` columns, or has a row
/// with more fields than the header. Rows with fewer fields are padded.
pub fn read_year_table(path: &Path, year: i32) -> Result<YearTable> {
    let file = File::open(path).map_err(|source| OsrError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |reason: String| OsrError::MalformedSource {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| malformed(format!("unreadable header: {e}")))?
        .clone();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(malformed("file has no header row".to_string()));
    }

    let layout = ColumnLayout::from_headers(&headers).map_err(malformed)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| malformed(format!("CSV parse error: {e}")))?;
        // Header is line 1; fall back to the row index when the reader has no position.
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);

        if record.len() > headers.len() {
            return Err(malformed(format!(
                "line {line}: expected {} fields, saw {}",
                headers.len(),
                record.len()
            )));
        }

        records.push(layout.to_raw_record(&record, year, line));
    }

    Ok(YearTable {
        year,
        path: path.to_path_buf(),
        columns: layout.passthrough.iter().map(|(name, _)| name.clone()).collect(),
        records,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Where the required and passthrough columns live in a file's rows.
struct ColumnLayout {
    description: usize,
    amount: usize,
    passthrough: Vec<(String, usize)>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> std::result::Result<Self, String> {
        let names: Vec<String> = headers.iter().map(normalize_header_name).collect();

        let find = |wanted: &str| names.iter().position(|n| n.eq_ignore_ascii_case(wanted));

        let description = find(DESCRIPTION_COLUMN)
            .ok_or_else(|| format!("missing required column `{DESCRIPTION_COLUMN}`"))?;
        let amount =
            find(AMOUNT_COLUMN).ok_or_else(|| format!("missing required column `{AMOUNT_COLUMN}`"))?;

        let passthrough = names
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                *idx != description
                    && *idx != amount
                    && !name.is_empty()
                    && !name.eq_ignore_ascii_case(YEAR_COLUMN)
            })
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        Ok(Self {
            description,
            amount,
            passthrough,
        })
    }

    fn to_raw_record(&self, record: &StringRecord, year: i32, line: usize) -> RawRecord {
        let description = record.get(self.description).unwrap_or_default().to_string();
        let amount = record
            .get(self.amount)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        let extra: BTreeMap<String, String> = self
            .passthrough
            .iter()
            .filter_map(|(name, idx)| record.get(*idx).map(|v| (name.clone(), v.to_string())))
            .collect();

        RawRecord {
            year,
            line,
            description,
            amount,
            extra,
        }
    }
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    // ── read_year_table ───────────────────────────────────────────────────────

    #[test]
    fn test_read_year_table_basic() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "2021.csv",
            &[
                "Receipt,Description,Amount",
                "R1,Trading License,100",
                "R2,Signage Fee,50",
            ],
        );

        let table = read_year_table(&path, 2021).unwrap();
        assert_eq!(table.year, 2021);
        assert_eq!(table.columns, vec!["Receipt".to_string()]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].description, "Trading License");
        assert_eq!(table.records[0].amount.as_deref(), Some("100"));
        assert_eq!(table.records[0].extra.get("Receipt").map(String::as_str), Some("R1"));
        assert_eq!(table.records[0].line, 2);
        assert_eq!(table.records[1].line, 3);
    }

    #[test]
    fn test_read_year_table_year_column_in_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "2022.csv",
            &["Year,Description,Amount", "1999,Market Levy,10"],
        );

        let table = read_year_table(&path, 2022).unwrap();
        assert_eq!(table.records[0].year, 2022);
        assert!(table.columns.is_empty());
        assert!(!table.records[0].extra.contains_key("Year"));
    }

    #[test]
    fn test_read_year_table_headers_case_insensitive_and_bom() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "2023.csv",
            &["\u{feff}description , AMOUNT", "Bus Levy,5"],
        );

        let table = read_year_table(&path, 2023).unwrap();
        assert_eq!(table.records[0].description, "Bus Levy");
        assert_eq!(table.records[0].amount.as_deref(), Some("5"));
    }

    #[test]
    fn test_read_year_table_empty_amount_is_none() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "2021.csv",
            &["Description,Amount", "Market Levy,  ", "Bus Levy"],
        );

        let table = read_year_table(&path, 2021).unwrap();
        assert_eq!(table.records.len(), 2);
        assert!(table.records[0].amount.is_none());
        // Short row is padded rather than rejected.
        assert!(table.records[1].amount.is_none());
    }

    #[test]
    fn test_read_year_table_missing_required_column() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(dir.path(), "2021.csv", &["Description,Total", "Fee,1"]);

        let err = read_year_table(&path, 2021).unwrap_err();
        assert!(matches!(err, OsrError::MalformedSource { .. }));
        assert!(err.to_string().contains("`Amount`"));
    }

    #[test]
    fn test_read_year_table_extra_fields_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "2021.csv",
            &["Description,Amount", "Fee,1", "Fee,2,unexpected"],
        );

        let err = read_year_table(&path, 2021).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_read_year_table_empty_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2021.csv");
        std::fs::File::create(&path).unwrap();

        let err = read_year_table(&path, 2021).unwrap_err();
        assert!(matches!(err, OsrError::MalformedSource { .. }));
    }

    #[test]
    fn test_read_year_table_invalid_utf8_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2021.csv");
        std::fs::write(&path, b"Description,Amount\n\xff\xfe,10\n").unwrap();

        let err = read_year_table(&path, 2021).unwrap_err();
        assert!(matches!(err, OsrError::MalformedSource { .. }));
    }

    fn loaded_years(report: &LoadReport) -> Vec<i32> {
        report.tables.iter().map(|t| t.year).collect()
    }

    // ── load_year_tables ──────────────────────────────────────────────────────

    #[test]
    fn test_load_year_tables_skips_missing_years() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2021.csv", &["Description,Amount", "Fee,1"]);
        write_csv(dir.path(), "2023.csv", &["Description,Amount", "Fee,2"]);

        let report = load_year_tables(dir.path(), &[2021, 2022, 2023, 2024]);

        assert_eq!(loaded_years(&report), vec![2021, 2023]);
        assert_eq!(report.missing_count(), 2);
        assert_eq!(report.malformed_count(), 0);
        assert!(report.warnings().is_empty());
        assert_eq!(report.sources.len(), 4);
        assert_eq!(report.rows_read(), 2);
    }

    #[test]
    fn test_load_year_tables_malformed_file_warns_and_continues() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2021.csv", &["Description,Amount", "Fee,1"]);
        write_csv(dir.path(), "2022.csv", &["Nothing,Useful", "a,b"]);
        write_csv(dir.path(), "2023.csv", &["Description,Amount", "Fee,3"]);

        let report = load_year_tables(dir.path(), &[2021, 2022, 2023]);

        assert_eq!(loaded_years(&report), vec![2021, 2023]);
        assert_eq!(report.malformed_count(), 1);
        let warnings = report.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("2022.csv"));
    }

    #[test]
    fn test_load_year_tables_keeps_requested_order() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2021.csv", &["Description,Amount", "Fee,1"]);
        write_csv(dir.path(), "2024.csv", &["Description,Amount", "Fee,4"]);

        let report = load_year_tables(dir.path(), &[2024, 2021]);
        assert_eq!(loaded_years(&report), vec![2024, 2021]);
    }

    #[test]
    fn test_load_year_tables_repeated_year_read_once() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2021.csv", &["Description,Amount", "Fee,1"]);

        let report = load_year_tables(dir.path(), &[2021, 2021]);
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.sources.len(), 1);
    }

    #[test]
    fn test_load_year_tables_nonexistent_dir() {
        let report = load_year_tables(Path::new("/tmp/does-not-exist-osr-test-xyz"), &[2021]);
        assert!(report.tables.is_empty());
        assert_eq!(report.missing_count(), 1);
    }

    #[test]
    fn test_year_source_path() {
        let p = year_source_path(Path::new("/data"), 2024);
        assert_eq!(p, PathBuf::from("/data/2024.csv"));
    }
}
