//! Concatenation of per-year tables into one dataset with a uniform schema.

use std::collections::HashSet;
use std::path::Path;

use osr_core::models::{RawDataset, YearTable};
use osr_core::{OsrError, Result};
use tracing::debug;

/// Concatenate `tables` in the order they were loaded, keeping row order
/// within each year. The passthrough schema is the union of every table's
/// columns in first-seen order.
///
/// An empty list is the terminal "no data" state: nothing downstream runs.
pub fn unify(tables: Vec<YearTable>, data_dir: &Path) -> Result<RawDataset> {
    if tables.is_empty() {
        return Err(OsrError::NoDataAvailable {
            data_dir: data_dir.to_path_buf(),
        });
    }

    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let total_rows: usize = tables.iter().map(|t| t.records.len()).sum();
    let mut records = Vec::with_capacity(total_rows);
    let table_count = tables.len();

    for table in tables {
        for column in table.columns {
            if seen.insert(column.clone()) {
                columns.push(column);
            }
        }
        records.extend(table.records);
    }

    debug!(
        "Unified {} rows from {} yearly tables ({} passthrough columns)",
        records.len(),
        table_count,
        columns.len()
    );

    Ok(RawDataset { columns, records })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
