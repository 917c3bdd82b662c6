//! Plain-text rendering of the dashboard views.
//!
//! Each view is a collection of sections already computed by
//! [`osr_data::analysis::analyze`]; nothing here recomputes aggregates.

use std::collections::BTreeMap;

use osr_core::formatting::{fit_width, format_amount, format_number, format_percent};
use osr_core::models::Record;
use osr_data::analysis::{AnalysisReport, InsightsSection, LoadMetadata, OverviewSection};
use osr_data::clustering::ClusterAnalysis;
use osr_data::distribution::{DistributionSummary, SegmentationOutcome};

const LABEL_WIDTH: usize = 32;
const AMOUNT_WIDTH: usize = 18;

// ── Text table ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct TextTable {
    columns: Vec<(String, usize, Align)>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn column(mut self, title: impl Into<String>, width: usize, align: Align) -> Self {
        self.columns.push((title.into(), width, align));
        self
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|(title, width, align)| cell(title, *width, *align))
            .collect();
        lines.push(header.join("  ").trim_end().to_string());
        let rule: usize = self.columns.iter().map(|(_, w, _)| w + 2).sum::<usize>();
        lines.push("-".repeat(rule.saturating_sub(2)));
        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, (_, width, align))| {
                    cell(row.get(i).map(String::as_str).unwrap_or(""), *width, *align)
                })
                .collect();
            lines.push(cells.join("  ").trim_end().to_string());
        }
        lines
    }
}

fn cell(text: &str, width: usize, align: Align) -> String {
    let fitted = fit_width(text, width);
    match align {
        Align::Left => fitted,
        Align::Right => format!("{:>width$}", fitted.trim_end(), width = width),
    }
}

fn heading(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(title.to_string());
    lines.push("=".repeat(title.chars().count()));
}

fn subheading(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(title.to_string());
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Render every section present in `report`.
///
/// `columns` are the passthrough column names shown in the raw table.
pub fn render_report(report: &AnalysisReport, columns: &[String]) -> String {
    let mut lines = vec!["Chipata OSR Analysis Dashboard".to_string()];
    lines.extend(render_load_summary(&report.load));

    if let Some(overview) = &report.overview {
        lines.extend(render_overview(overview));
    }
    if let Some(clustering) = &report.clustering {
        lines.extend(render_clustering(clustering));
    }
    if let Some(insights) = &report.insights {
        lines.extend(render_insights(insights));
    }
    if let Some(raw) = &report.raw {
        lines.extend(render_raw(raw, columns));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Load summary plus one warning line per malformed file.
pub fn render_load_summary(load: &LoadMetadata) -> Vec<String> {
    let mut lines = vec![format!(
        "{} files loaded, {} missing, {} malformed; {} rows read, {} dropped (non-numeric Amount)",
        load.files_loaded, load.files_missing, load.files_malformed, load.rows_read, load.rows_dropped
    )];
    if !load.dropped_by_year.is_empty() {
        let per_year: Vec<String> = load
            .dropped_by_year
            .iter()
            .map(|(year, count)| format!("{year}: {count}"))
            .collect();
        lines.push(format!("Dropped by year: {}", per_year.join(", ")));
    }
    for warning in &load.warnings {
        lines.push(format!("Warning: {warning}"));
    }
    lines
}

// ── Overview ──────────────────────────────────────────────────────────────────

pub fn render_overview(overview: &OverviewSection) -> Vec<String> {
    let mut lines = Vec::new();
    heading(&mut lines, "Revenue Overview");

    subheading(&mut lines, "Total Revenue by Year");
    let mut table = TextTable::new()
        .column("Year", 6, Align::Left)
        .column("Amount", AMOUNT_WIDTH, Align::Right)
        .column("Share", 8, Align::Right);
    for row in &overview.total_by_year {
        table.row(vec![
            row.key.to_string(),
            format_amount(row.sum_amount),
            format_percent(row.percentage),
        ]);
    }
    lines.extend(table.render());

    subheading(&mut lines, "Number of Records by Year");
    let mut table = TextTable::new()
        .column("Year", 6, Align::Left)
        .column("Records", 10, Align::Right);
    for row in &overview.count_by_year {
        table.row(vec![row.key.to_string(), format_number(row.count as f64, 0)]);
    }
    lines.extend(table.render());

    subheading(&mut lines, "Revenue Distribution by Year and Fee");
    let mut table = TextTable::new()
        .column("Year", 6, Align::Left)
        .column("Description", LABEL_WIDTH, Align::Left)
        .column("Amount", AMOUNT_WIDTH, Align::Right)
        .column("Share", 8, Align::Right);
    for row in &overview.by_year_and_category {
        table.row(vec![
            row.key.year.to_string(),
            row.key.description.clone(),
            format_amount(row.sum_amount),
            format_percent(row.percentage),
        ]);
    }
    lines.extend(table.render());

    subheading(&mut lines, "Revenue Trend by Fee over Time");
    let years: Vec<i32> = overview
        .category_trend
        .iter()
        .flat_map(|t| t.points.iter().map(|p| p.year))
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut table = TextTable::new().column("Description", LABEL_WIDTH, Align::Left);
    for year in &years {
        table = table.column(year.to_string(), AMOUNT_WIDTH, Align::Right);
    }
    for trend in &overview.category_trend {
        let by_year: BTreeMap<i32, f64> =
            trend.points.iter().map(|p| (p.year, p.sum_amount)).collect();
        let mut cells = vec![trend.description.clone()];
        cells.extend(years.iter().map(|y| {
            by_year
                .get(y)
                .map(|v| format_amount(*v))
                .unwrap_or_else(|| "-".to_string())
        }));
        table.row(cells);
    }
    lines.extend(table.render());

    lines
}

// ── Clustering ────────────────────────────────────────────────────────────────

pub fn render_clustering(analysis: &ClusterAnalysis) -> Vec<String> {
    let mut lines = Vec::new();
    heading(
        &mut lines,
        "K-Nearest Neighbors Analysis on Licenses, Levies and Fees",
    );

    let year = analysis
        .year
        .map_or_else(|| "all years".to_string(), |y| y.to_string());
    lines.push(format!(
        "Year: {year}  K: {}  Records: {}  Categories: {}",
        analysis.k,
        analysis.points.len(),
        analysis.encoding.len()
    ));
    let ratios: Vec<String> = analysis
        .explained_variance_ratio
        .iter()
        .map(|r| format_percent(r * 100.0))
        .collect();
    lines.push(format!("Explained variance: {}", ratios.join(" / ")));
    if let Some(accuracy) = analysis.loo_accuracy {
        lines.push(format!(
            "Leave-one-out accuracy: {}",
            format_percent(accuracy * 100.0)
        ));
    }

    // Per-category centroid of the projected points.
    let mut centroids: BTreeMap<usize, (f64, f64, usize)> = BTreeMap::new();
    for point in &analysis.points {
        let slot = centroids.entry(point.code).or_insert((0.0, 0.0, 0));
        slot.0 += point.dim1;
        slot.1 += point.dim2;
        slot.2 += 1;
    }

    subheading(&mut lines, "Category Centroids");
    let mut table = TextTable::new()
        .column("Code", 5, Align::Right)
        .column("Description", LABEL_WIDTH, Align::Left)
        .column("Records", 8, Align::Right)
        .column("Dimension 1", 12, Align::Right)
        .column("Dimension 2", 12, Align::Right);
    for (code, (sum1, sum2, count)) in centroids {
        let n = count as f64;
        table.row(vec![
            code.to_string(),
            analysis.encoding.label(code).unwrap_or("").to_string(),
            count.to_string(),
            format_number(sum1 / n, 3),
            format_number(sum2 / n, 3),
        ]);
    }
    lines.extend(table.render());

    lines
}

// ── Insights ──────────────────────────────────────────────────────────────────

pub fn render_insights(insights: &InsightsSection) -> Vec<String> {
    let mut lines = Vec::new();
    heading(&mut lines, "Revenue Insights");
    lines.push(format!(
        "Total revenue: {}",
        format_amount(insights.total_revenue)
    ));

    subheading(&mut lines, "Top Revenue-Contributing Levies and Fees");
    let mut table = TextTable::new()
        .column("Description", LABEL_WIDTH, Align::Left)
        .column("Amount", AMOUNT_WIDTH, Align::Right)
        .column("Percentage", 10, Align::Right);
    for row in &insights.top_contributors {
        table.row(vec![
            row.key.clone(),
            format_amount(row.sum_amount),
            format_percent(row.percentage),
        ]);
    }
    lines.extend(table.render());

    lines.extend(render_distribution(&insights.distribution));
    lines
}

fn render_distribution(summary: &DistributionSummary) -> Vec<String> {
    let mut lines = Vec::new();
    subheading(&mut lines, "Amount Distribution");
    lines.push(format!(
        "Records: {}  Mean: {}  Std dev: {}  Min: {}  Max: {}",
        summary.count,
        format_amount(summary.mean),
        format_amount(summary.std_dev),
        format_amount(summary.min),
        format_amount(summary.max)
    ));
    let percentiles: Vec<String> = summary
        .percentiles
        .iter()
        .map(|p| {
            format!(
                "P{}: {}",
                format_number(p.quantile * 100.0, 0),
                format_amount(p.amount)
            )
        })
        .collect();
    lines.push(percentiles.join("  "));

    match &summary.segmentation {
        SegmentationOutcome::Segmented(seg) => {
            let counts: Vec<String> = seg
                .counts
                .iter()
                .map(|c| format!("{}: {}", c.label, c.count))
                .collect();
            lines.push(format!("Segments: {}", counts.join("  ")));
        }
        SegmentationOutcome::Degenerate { message } => {
            lines.push(format!("Segments unavailable: {message}"));
        }
    }

    let pareto = &summary.pareto;
    subheading(
        &mut lines,
        &format!(
            "Pareto set ({} of revenue)",
            format_percent(pareto.threshold * 100.0)
        ),
    );
    lines.push(format!(
        "{} categories account for {} of revenue",
        pareto.category_count,
        format_percent(pareto.share * 100.0)
    ));
    for entry in &pareto.entries {
        lines.push(format!(
            "  {}  {:>width$}  {}",
            fit_width(&entry.description, LABEL_WIDTH),
            format_amount(entry.sum_amount),
            format_percent(entry.cumulative_share * 100.0),
            width = AMOUNT_WIDTH
        ));
    }
    lines
}

// ── Raw data ──────────────────────────────────────────────────────────────────

pub fn render_raw(records: &[Record], columns: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    heading(&mut lines, "Combined Data");

    let mut table = TextTable::new()
        .column("Year", 6, Align::Left)
        .column("Description", LABEL_WIDTH, Align::Left)
        .column("Amount", AMOUNT_WIDTH, Align::Right);
    for column in columns {
        table = table.column(column.clone(), 16, Align::Left);
    }
    for record in records {
        let mut cells = vec![
            record.year.to_string(),
            record.description.clone(),
            format_amount(record.amount),
        ];
        cells.extend(
            columns
                .iter()
                .map(|c| record.extra.get(c).cloned().unwrap_or_default()),
        );
        table.row(cells);
    }
    lines.extend(table.render());
    lines
}

// ── Tests ─────────────────────────────────────────────────────────────────────
