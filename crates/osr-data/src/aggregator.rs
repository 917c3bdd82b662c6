//! Grouped revenue aggregates by year, by category and by both.
//!
//! Groups are emitted in ascending key order; descending rankings use a
//! stable sort over that order, so equal totals keep their key order.

use std::collections::BTreeMap;

use osr_core::models::{AggregateRow, CombinedDataset, Record, YearCategory};
use osr_core::stats::percentage;
use serde::Serialize;

/// Decimal places kept on every percentage-of-total.
pub const PERCENT_DECIMALS: u32 = 2;

// ── Trend series ──────────────────────────────────────────────────────────────

/// Revenue of one category in one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub sum_amount: f64,
}

/// Year-over-year revenue series of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTrend {
    pub description: String,
    /// Ascending by year; years without records for the category are absent.
    pub points: Vec<TrendPoint>,
}

// ── RevenueAggregator ─────────────────────────────────────────────────────────

/// Groups the sanitized records of one request.
///
/// The grand total is summed once at construction and shared by every
/// percentage this aggregator reports.
pub struct RevenueAggregator<'a> {
    dataset: &'a CombinedDataset,
    grand_total: f64,
}

impl<'a> RevenueAggregator<'a> {
    pub fn new(dataset: &'a CombinedDataset) -> Self {
        Self {
            dataset,
            grand_total: dataset.grand_total(),
        }
    }

    /// Sum of every amount; the denominator of all percentages.
    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }

    /// Years present in the data, newest first.
    pub fn available_years(&self) -> Vec<i32> {
        let mut years = self.dataset.years();
        years.reverse();
        years
    }

    /// Total revenue per year, ranked from highest to lowest.
    pub fn total_by_year(&self) -> Vec<AggregateRow<i32>> {
        let mut rows = self.aggregate_by(|r| r.year);
        rank_descending(&mut rows);
        rows
    }

    /// Record count per year, ascending by year.
    pub fn count_by_year(&self) -> Vec<AggregateRow<i32>> {
        self.aggregate_by(|r| r.year)
    }

    /// Revenue per (year, category), ranked from highest to lowest.
    pub fn by_year_and_category(&self) -> Vec<AggregateRow<YearCategory>> {
        let mut rows = self.aggregate_by(|r| YearCategory {
            year: r.year,
            description: r.description.clone(),
        });
        rank_descending(&mut rows);
        rows
    }

    /// Revenue per category with its share of the grand total, ranked from
    /// highest to lowest.
    pub fn by_category(&self) -> Vec<AggregateRow<String>> {
        let mut rows = self.aggregate_by(|r| r.description.clone());
        rank_descending(&mut rows);
        rows
    }

    /// Per-category revenue series across years, categories ascending by name.
    pub fn category_trend(&self) -> Vec<CategoryTrend> {
        let mut map: BTreeMap<&str, BTreeMap<i32, f64>> = BTreeMap::new();
        for record in &self.dataset.records {
            *map.entry(record.description.as_str())
                .or_default()
                .entry(record.year)
                .or_insert(0.0) += record.amount;
        }

        map.into_iter()
            .map(|(description, years)| CategoryTrend {
                description: description.to_string(),
                points: years
                    .into_iter()
                    .map(|(year, sum_amount)| TrendPoint { year, sum_amount })
                    .collect(),
            })
            .collect()
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Generic aggregation driver. `key_fn` maps a record to its group key.
    fn aggregate_by<K: Ord>(&self, key_fn: impl Fn(&Record) -> K) -> Vec<AggregateRow<K>> {
        // BTreeMap gives ascending key emission order.
        let mut map: BTreeMap<K, (f64, usize)> = BTreeMap::new();
        for record in &self.dataset.records {
            let slot = map.entry(key_fn(record)).or_insert((0.0, 0));
            slot.0 += record.amount;
            slot.1 += 1;
        }

        map.into_iter()
            .map(|(key, (sum_amount, count))| AggregateRow {
                key,
                sum_amount,
                count,
                percentage: percentage(sum_amount, self.grand_total, PERCENT_DECIMALS),
            })
            .collect()
    }
}

/// Stable descending sort by sum.
fn rank_descending<K>(rows: &mut [AggregateRow<K>]) {
    rows.sort_by(|a, b| b.sum_amount.total_cmp(&a.sum_amount));
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, description: &str, amount: f64) -> Record {
        Record {
            year,
            line: 2,
            description: description.to_string(),
            amount,
            extra: Default::default(),
        }
    }

    fn scenario() -> CombinedDataset {
        CombinedDataset::new(
            vec![],
            vec![
                record(2021, "Trading License", 100.0),
                record(2021, "Signage Fee", 50.0),
                record(2022, "Trading License", 200.0),
            ],
        )
    }

    // ── total_by_year ─────────────────────────────────────────────────────────

    #[test]
    fn test_total_by_year_ranked_descending() {
        let rows = RevenueAggregator::new(&scenario()).total_by_year();

        let pairs: Vec<(i32, f64)> = rows.iter().map(|r| (r.key, r.sum_amount)).collect();
        assert_eq!(pairs, vec![(2022, 200.0), (2021, 150.0)]);
        assert_eq!(rows[1].count, 2);
    }

    #[test]
    fn test_total_by_year_ties_keep_ascending_year_order() {
        let ds = CombinedDataset::new(
            vec![],
            vec![
                record(2023, "A", 10.0),
                record(2021, "A", 10.0),
                record(2022, "A", 30.0),
            ],
        );
        let years: Vec<i32> = RevenueAggregator::new(&ds).total_by_year()
            .iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(years, vec![2022, 2021, 2023]);
    }

    // ── count_by_year ─────────────────────────────────────────────────────────

    #[test]
    fn test_count_by_year_matches_rows_per_year() {
        let ds = scenario();
        let counts = RevenueAggregator::new(&ds).count_by_year();

        assert_eq!(counts.len(), 2);
        for row in &counts {
            assert_eq!(row.count, ds.records_for_year(row.key).len());
        }
        assert_eq!(counts[0].key, 2021);
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn test_count_and_total_consistent() {
        let ds = scenario();
        let totals = RevenueAggregator::new(&ds).total_by_year();
        let counts = RevenueAggregator::new(&ds).count_by_year();
        for total in &totals {
            let count = counts.iter().find(|c| c.key == total.key).unwrap();
            assert_eq!(count.count, total.count);
        }
    }

    // ── by_category ───────────────────────────────────────────────────────────

    #[test]
    fn test_by_category_percentages() {
        let rows = RevenueAggregator::new(&scenario()).by_category();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "Trading License");
        assert!((rows[0].sum_amount - 300.0).abs() < 1e-9);
        assert!((rows[0].percentage - 85.71).abs() < 1e-9);
        assert_eq!(rows[1].key, "Signage Fee");
        assert!((rows[1].sum_amount - 50.0).abs() < 1e-9);
        assert!((rows[1].percentage - 14.29).abs() < 1e-9);
    }

    #[test]
    fn test_by_category_tie_share_rounds_to_even() {
        let ds = CombinedDataset::new(
            vec![],
            vec![record(2021, "A", 1.0), record(2021, "B", 799.0)],
        );
        let rows = RevenueAggregator::new(&ds).by_category();

        let a = rows.iter().find(|r| r.key == "A").unwrap();
        // 1 / 800 = 0.125 %, an exact tie at two decimals.
        assert_eq!(a.percentage, 0.12);
    }

    #[test]
    fn test_by_category_percentages_sum_to_hundred() {
        let ds = CombinedDataset::new(
            vec![],
            vec![
                record(2021, "A", 13.0),
                record(2021, "B", 29.0),
                record(2022, "C", 7.0),
                record(2023, "D", 51.5),
                record(2024, "A", 3.25),
            ],
        );
        let sum: f64 = RevenueAggregator::new(&ds).by_category()
            .iter()
            .map(|r| r.percentage)
            .sum();
        // Each share is rounded to 2 decimals, so allow one rounding step per group.
        assert!((sum - 100.0).abs() <= 0.05, "sum = {sum}");
    }

    #[test]
    fn test_by_category_zero_total_gives_zero_percent() {
        let ds = CombinedDataset::new(
            vec![],
            vec![record(2021, "A", 5.0), record(2021, "B", -5.0)],
        );
        let rows = RevenueAggregator::new(&ds).by_category();
        assert!(rows.iter().all(|r| r.percentage == 0.0));
    }

    // ── by_year_and_category ──────────────────────────────────────────────────

    #[test]
    fn test_by_year_and_category_groups_and_ranks() {
        let rows = RevenueAggregator::new(&scenario()).by_year_and_category();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].key.year, 2022);
        assert_eq!(rows[0].key.description, "Trading License");
        assert_eq!(rows[2].key.description, "Signage Fee");
        let share: f64 = rows.iter().map(|r| r.percentage).sum();
        assert!((share - 100.0).abs() <= 0.03);
    }

    // ── category_trend ────────────────────────────────────────────────────────

    #[test]
    fn test_category_trend_series() {
        let trend = RevenueAggregator::new(&scenario()).category_trend();

        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].description, "Signage Fee");
        assert_eq!(
            trend[0].points,
            vec![TrendPoint {
                year: 2021,
                sum_amount: 50.0
            }]
        );
        let years: Vec<i32> = trend[1].points.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2021, 2022]);
    }

    // ── available_years / grand_total ─────────────────────────────────────────

    #[test]
    fn test_available_years_newest_first() {
        assert_eq!(RevenueAggregator::new(&scenario()).available_years(), vec![2022, 2021]);
    }

    #[test]
    fn test_grand_total() {
        assert!((RevenueAggregator::new(&scenario()).grand_total() - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_every_grouping_shares_one_denominator() {
        let ds = scenario();
        let aggregator = RevenueAggregator::new(&ds);
        let total = aggregator.grand_total();

        let by_year: f64 = aggregator.total_by_year().iter().map(|r| r.sum_amount).sum();
        assert!((by_year - total).abs() < 1e-9);
        for row in aggregator.by_year_and_category() {
            let expected = percentage(row.sum_amount, total, PERCENT_DECIMALS);
            assert_eq!(row.percentage, expected);
        }
    }

    #[test]
    fn test_empty_dataset_produces_no_groups() {
        let ds = CombinedDataset::default();
        assert!(RevenueAggregator::new(&ds).total_by_year().is_empty());
        assert!(RevenueAggregator::new(&ds).by_category().is_empty());
        assert!(RevenueAggregator::new(&ds).category_trend().is_empty());
    }
}
