//! Request pipeline for the revenue dashboard.
//!
//! [`load_dataset`] runs Loader → Unifier → Sanitizer once per data
//! directory. [`analyze`] then recomputes the sections a view needs from the
//! read-only dataset, so changing the year, the neighbor count or the raw
//! toggle never touches the files again.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use osr_core::models::{AggregateRow, CombinedDataset, Record, YearCategory};
use osr_core::settings::{AnalysisParams, View, YearSelection};
use osr_core::{OsrError, Result};
use serde::Serialize;
use tracing::info;

use crate::aggregator::{CategoryTrend, RevenueAggregator};
use crate::clustering::{cluster, ClusterAnalysis};
use crate::distribution::{summarize, DistributionSummary};
use crate::loader::{load_year_tables, SourceReport};
use crate::sanitizer::{sanitize, DroppedRow};
use crate::unifier::unify;

// ── Public types ──────────────────────────────────────────────────────────────

/// Data-quality and timing facts about one load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadMetadata {
    /// ISO-8601 timestamp when the dataset was loaded.
    pub generated_at: String,
    pub files_loaded: usize,
    pub files_missing: usize,
    pub files_malformed: usize,
    /// Data rows read from every loaded file, before sanitizing.
    pub rows_read: usize,
    /// Rows removed because their amount was not numeric.
    pub rows_dropped: usize,
    /// Dropped rows per year, ascending by year; years without drops are absent.
    pub dropped_by_year: BTreeMap<i32, usize>,
    /// Wall-clock seconds spent reading and sanitizing.
    pub load_time_seconds: f64,
    /// One user-visible message per malformed file.
    pub warnings: Vec<String>,
}

/// The sanitized dataset plus everything learned while building it.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedDataset {
    pub dataset: CombinedDataset,
    pub sources: Vec<SourceReport>,
    pub dropped: Vec<DroppedRow>,
    pub metadata: LoadMetadata,
}

/// Yearly totals and the per-fee breakdowns.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewSection {
    pub total_by_year: Vec<AggregateRow<i32>>,
    pub count_by_year: Vec<AggregateRow<i32>>,
    pub by_year_and_category: Vec<AggregateRow<YearCategory>>,
    pub category_trend: Vec<CategoryTrend>,
}

/// Top contributors and the shape of the amount distribution.
#[derive(Debug, Clone, Serialize)]
pub struct InsightsSection {
    pub total_revenue: f64,
    pub top_contributors: Vec<AggregateRow<String>>,
    pub distribution: DistributionSummary,
}

/// Everything computed for one request. Sections not requested by the view
/// are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub params: AnalysisParams,
    pub load: LoadMetadata,
    /// Years present in the data, newest first.
    pub available_years: Vec<i32>,
    pub grand_total: f64,
    pub overview: Option<OverviewSection>,
    pub clustering: Option<ClusterAnalysis>,
    pub insights: Option<InsightsSection>,
    /// The sanitized combined table, when requested.
    pub raw: Option<Vec<Record>>,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Read every requested year from `data_dir`, unify and sanitize.
///
/// Fails with [`OsrError::NoDataAvailable`] when no year yields a usable
/// record; that is the terminal empty state for the request.
pub fn load_dataset(data_dir: &Path, years: &[i32]) -> Result<LoadedDataset> {
    let load_start = Instant::now();

    let report = load_year_tables(data_dir, years);
    let warnings = report.warnings();
    let files_loaded = report.tables.len();
    let files_missing = report.missing_count();
    let files_malformed = report.malformed_count();
    let rows_read = report.rows_read();

    let raw = unify(report.tables, data_dir)?;
    let sanitized = sanitize(raw);
    if sanitized.dataset.is_empty() {
        return Err(OsrError::NoDataAvailable {
            data_dir: data_dir.to_path_buf(),
        });
    }

    let metadata = LoadMetadata {
        generated_at: Utc::now().to_rfc3339(),
        files_loaded,
        files_missing,
        files_malformed,
        rows_read,
        rows_dropped: sanitized.dropped_count(),
        dropped_by_year: sanitized.dropped_by_year(),
        load_time_seconds: load_start.elapsed().as_secs_f64(),
        warnings,
    };

    info!(
        "Loaded {} records from {} files ({} missing, {} malformed, {} rows dropped)",
        sanitized.dataset.len(),
        metadata.files_loaded,
        metadata.files_missing,
        metadata.files_malformed,
        metadata.rows_dropped
    );

    Ok(LoadedDataset {
        dataset: sanitized.dataset,
        sources: report.sources,
        dropped: sanitized.dropped,
        metadata,
    })
}

/// Compute the sections `params.view` asks for.
pub fn analyze(loaded: &LoadedDataset, params: &AnalysisParams) -> Result<AnalysisReport> {
    let dataset = &loaded.dataset;
    if dataset.is_empty() {
        return Err(OsrError::EmptySelection);
    }

    let aggregator = RevenueAggregator::new(dataset);
    let available_years = aggregator.available_years();
    let view: View = params.view;

    let overview = view.includes_overview().then(|| OverviewSection {
        total_by_year: aggregator.total_by_year(),
        count_by_year: aggregator.count_by_year(),
        by_year_and_category: aggregator.by_year_and_category(),
        category_trend: aggregator.category_trend(),
    });

    let clustering = if view.includes_clustering() {
        let year = resolve_year(params.year, &available_years);
        Some(cluster(dataset, year, params.k)?)
    } else {
        None
    };

    let insights = if view.includes_insights() {
        let by_category = aggregator.by_category();
        let distribution = summarize(dataset, &by_category)?;
        Some(InsightsSection {
            total_revenue: aggregator.grand_total(),
            top_contributors: by_category,
            distribution,
        })
    } else {
        None
    };

    Ok(AnalysisReport {
        generated_at: Utc::now().to_rfc3339(),
        params: params.clone(),
        load: loaded.metadata.clone(),
        grand_total: aggregator.grand_total(),
        available_years,
        overview,
        clustering,
        insights,
        raw: params.show_raw.then(|| dataset.records.clone()),
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// `Latest` picks the newest year present; `All` means no filter.
fn resolve_year(selection: YearSelection, available_newest_first: &[i32]) -> Option<i32> {
    match selection {
        YearSelection::Latest => available_newest_first.first().copied(),
        YearSelection::Year(y) => Some(y),
        YearSelection::All => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
