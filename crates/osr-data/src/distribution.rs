//! Distribution statistics over the `Amount` column: percentiles,
//! equal-frequency segmentation and the 80/20 contributor set.

use osr_core::models::{AggregateRow, CombinedDataset};
use osr_core::stats::{distinct_count, mean, population_std, quantile, sorted};
use osr_core::{OsrError, Result};
use serde::Serialize;
use tracing::warn;

/// Quantiles reported when none are requested.
pub const DEFAULT_QUANTILES: [f64; 4] = [0.25, 0.5, 0.75, 0.9];

/// Labels of the default three-way segmentation.
pub const DEFAULT_SEGMENT_LABELS: [&str; 3] = ["Low", "Medium", "High"];

/// Cumulative share bounding the Pareto set.
pub const PARETO_THRESHOLD: f64 = 0.80;

// ── Percentiles ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileValue {
    pub quantile: f64,
    pub amount: f64,
}

/// Amount at each requested quantile, in request order.
pub fn percentiles(dataset: &CombinedDataset, quantiles: &[f64]) -> Result<Vec<PercentileValue>> {
    if let Some(q) = quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
        return Err(OsrError::InvalidParameter(format!(
            "quantile {q} is outside 0..=1"
        )));
    }
    let values = sorted(&dataset.amounts());
    quantiles
        .iter()
        .map(|&q| {
            quantile(&values, q)
                .map(|amount| PercentileValue { quantile: q, amount })
                .ok_or(OsrError::EmptySelection)
        })
        .collect()
}

// ── Segmentation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentCount {
    pub label: String,
    pub count: usize,
}

/// Equal-frequency binning of every record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub labels: Vec<String>,
    /// `labels.len() + 1` strictly increasing bin edges.
    pub edges: Vec<f64>,
    /// Label index per record, aligned with dataset order.
    pub assignments: Vec<usize>,
    pub counts: Vec<SegmentCount>,
}

/// Split records into `bins` equal-frequency bins of Amount.
///
/// Edges are the quantiles at `i / bins`. Bins are right-closed; the first
/// one also holds its lower edge. Edges that are not strictly increasing
/// mean some bin would be empty or duplicated, which is an error.
pub fn segment(dataset: &CombinedDataset, bins: usize, labels: &[&str]) -> Result<Segmentation> {
    if bins == 0 {
        return Err(OsrError::InvalidParameter(
            "segmentation needs at least one bin".to_string(),
        ));
    }
    if labels.len() != bins {
        return Err(OsrError::InvalidParameter(format!(
            "{} labels given for {bins} bins",
            labels.len()
        )));
    }

    let amounts = dataset.amounts();
    let values = sorted(&amounts);
    if values.is_empty() {
        return Err(OsrError::EmptySelection);
    }

    let edges: Vec<f64> = (0..=bins)
        .filter_map(|i| quantile(&values, i as f64 / bins as f64))
        .collect();
    if edges.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(OsrError::DegenerateSegmentation {
            bins,
            distinct: distinct_count(&values),
        });
    }

    let assignments: Vec<usize> = amounts.iter().map(|&v| bin_of(&edges, v)).collect();
    let mut counts: Vec<SegmentCount> = labels
        .iter()
        .map(|l| SegmentCount {
            label: l.to_string(),
            count: 0,
        })
        .collect();
    for &bin in &assignments {
        counts[bin].count += 1;
    }

    Ok(Segmentation {
        labels: labels.iter().map(|l| l.to_string()).collect(),
        edges,
        assignments,
        counts,
    })
}

/// Index of the first bin whose upper edge is at or above `value`.
fn bin_of(edges: &[f64], value: f64) -> usize {
    let last = edges.len() - 2;
    edges[1..]
        .iter()
        .position(|&hi| value <= hi)
        .unwrap_or(last)
        .min(last)
}

// ── Pareto ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoEntry {
    pub description: String,
    pub sum_amount: f64,
    pub cumulative_amount: f64,
    /// Cumulative share of the grand total as a fraction (`0.0..=1.0`).
    pub cumulative_share: f64,
}

/// Top categories whose cumulative share stays within the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoSet {
    pub threshold: f64,
    pub entries: Vec<ParetoEntry>,
    pub category_count: usize,
    /// Combined share of the returned categories.
    pub share: f64,
}

/// Largest prefix of categories, ranked by revenue, whose cumulative share
/// of the total is `<= threshold`. The category that would cross the
/// threshold is excluded, so a dominant first category yields an empty set.
pub fn pareto_set(by_category: &[AggregateRow<String>], threshold: f64) -> Result<ParetoSet> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(OsrError::InvalidParameter(format!(
            "Pareto threshold {threshold} is outside 0..=1"
        )));
    }

    let mut ranked: Vec<&AggregateRow<String>> = by_category.iter().collect();
    ranked.sort_by(|a, b| b.sum_amount.total_cmp(&a.sum_amount));
    let total: f64 = ranked.iter().map(|r| r.sum_amount).sum();

    let mut entries = Vec::new();
    if total != 0.0 {
        let mut cumulative_amount = 0.0;
        for row in ranked {
            cumulative_amount += row.sum_amount;
            let cumulative_share = cumulative_amount / total;
            if cumulative_share > threshold {
                break;
            }
            entries.push(ParetoEntry {
                description: row.key.clone(),
                sum_amount: row.sum_amount,
                cumulative_amount,
                cumulative_share,
            });
        }
    }

    Ok(ParetoSet {
        threshold,
        category_count: entries.len(),
        share: entries.last().map_or(0.0, |e| e.cumulative_share),
        entries,
    })
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Segmentation result as carried inside a full report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentationOutcome {
    Segmented(Segmentation),
    Degenerate { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Vec<PercentileValue>,
    pub segmentation: SegmentationOutcome,
    pub pareto: ParetoSet,
}

/// Percentiles, default three-way segmentation and Pareto set in one pass.
///
/// A degenerate segmentation is reported inside the summary rather than
/// failing the whole summary.
pub fn summarize(
    dataset: &CombinedDataset,
    by_category: &[AggregateRow<String>],
) -> Result<DistributionSummary> {
    let values = sorted(&dataset.amounts());
    let (min, max) = match (values.first(), values.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => return Err(OsrError::EmptySelection),
    };

    let segmentation = match segment(
        dataset,
        DEFAULT_SEGMENT_LABELS.len(),
        &DEFAULT_SEGMENT_LABELS,
    ) {
        Ok(seg) => SegmentationOutcome::Segmented(seg),
        Err(e @ OsrError::DegenerateSegmentation { .. }) => {
            warn!("{e}");
            SegmentationOutcome::Degenerate {
                message: e.to_string(),
            }
        }
        Err(e) => return Err(e),
    };

    Ok(DistributionSummary {
        count: values.len(),
        mean: mean(&values),
        std_dev: population_std(&values),
        min,
        max,
        percentiles: percentiles(dataset, &DEFAULT_QUANTILES)?,
        segmentation,
        pareto: pareto_set(by_category, PARETO_THRESHOLD)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
