use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Year identifiers looked up when no explicit list is configured.
pub const DEFAULT_YEARS: [i32; 4] = [2021, 2022, 2023, 2024];

/// Name of the column holding the category label.
pub const DESCRIPTION_COLUMN: &str = "Description";

/// Name of the column holding the monetary value.
pub const AMOUNT_COLUMN: &str = "Amount";

/// Name of the column the loader assigns; any source column of that name is replaced.
pub const YEAR_COLUMN: &str = "Year";

/// A revenue row exactly as read from a yearly file, before numeric coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Year of the source file the row came from.
    pub year: i32,
    /// 1-based line number inside the source file.
    pub line: usize,
    /// Category label (levy / fee / licence type).
    pub description: String,
    /// Raw amount text; `None` when the cell was empty or absent.
    pub amount: Option<String>,
    /// Every other column of the row, keyed by header name.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// All rows loaded from one yearly source file.
#[derive(Debug, Clone)]
pub struct YearTable {
    pub year: i32,
    pub path: PathBuf,
    /// Passthrough column names in file order (excludes Description, Amount and Year).
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// Concatenation of every loaded [`YearTable`], before sanitizing.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    /// Union of passthrough columns in first-seen order.
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// A sanitized revenue row: the amount is guaranteed to be a finite number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub year: i32,
    pub line: usize,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// The unified, sanitized dataset every analysis runs against.
///
/// Read-only once built; every derived view is recomputed from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinedDataset {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl CombinedDataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether at least one record carries `year`.
    pub fn contains_year(&self, year: i32) -> bool {
        self.records.iter().any(|r| r.year == year)
    }

    /// Records of a single year, in dataset order.
    pub fn records_for_year(&self, year: i32) -> Vec<&Record> {
        self.records.iter().filter(|r| r.year == year).collect()
    }

    /// Amount column in dataset order.
    pub fn amounts(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.amount).collect()
    }

    /// Sum of every amount in the dataset.
    pub fn grand_total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }
}

/// One grouped aggregate: the group key, its sum, size and share of the grand total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow<K> {
    pub key: K,
    pub sum_amount: f64,
    pub count: usize,
    /// `sum_amount / grand_total * 100`, rounded to two decimals.
    pub percentage: f64,
}

/// Group key for the year × category partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearCategory {
    pub year: i32,
    pub description: String,
}

/// One projected record of the clustering view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    /// First principal-component coordinate.
    pub dim1: f64,
    /// Second principal-component coordinate.
    pub dim2: f64,
    /// Original category label.
    pub label: String,
    /// Category code assigned by the per-call encoding.
    pub code: usize,
    pub year: i32,
    pub amount: f64,
}
