use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::DEFAULT_YEARS;

/// Smallest accepted neighbor count for the clustering view.
pub const MIN_NEIGHBORS: usize = 1;
/// Largest accepted neighbor count for the clustering view.
pub const MAX_NEIGHBORS: usize = 10;
/// Neighbor count used when none is given.
pub const DEFAULT_NEIGHBORS: usize = 3;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Own-source revenue analysis over yearly licence, levy and fee records
#[derive(Parser, Debug, Clone)]
#[command(
    name = "osr-dashboard",
    about = "Own-source revenue analysis over yearly licence, levy and fee records",
    version
)]
pub struct Settings {
    /// Directory holding one `<year>.csv` file per year
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Years to look for, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_YEARS.to_vec())]
    pub years: Vec<i32>,

    /// Which dashboard view to produce
    #[arg(long, default_value = "all", value_parser = ["overview", "clustering", "insights", "all"])]
    pub view: String,

    /// Year used by the clustering view (defaults to the most recent year present)
    #[arg(long)]
    pub year: Option<i32>,

    /// Run the clustering view over every year instead of a single one
    #[arg(long, conflicts_with = "year")]
    pub all_years: bool,

    /// Number of neighbors (K) for the nearest-neighbor classifier (1-10)
    #[arg(short = 'k', long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=10))]
    pub neighbors: u8,

    /// Include the sanitized combined table in the output
    #[arg(long)]
    pub show_raw: bool,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Analysis parameters ────────────────────────────────────────────────────────

/// Collection of sections a dashboard page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Totals and counts per year plus the per-fee breakdown and trend.
    Overview,
    /// Nearest-neighbor clustering projection for one year.
    Clustering,
    /// Top revenue contributors, distribution statistics and Pareto set.
    Insights,
    /// Every section.
    All,
}

impl View {
    /// Parse a view name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "overview" => Some(Self::Overview),
            "clustering" => Some(Self::Clustering),
            "insights" => Some(Self::Insights),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn includes_overview(self) -> bool {
        matches!(self, Self::Overview | Self::All)
    }

    pub fn includes_clustering(self) -> bool {
        matches!(self, Self::Clustering | Self::All)
    }

    pub fn includes_insights(self) -> bool {
        matches!(self, Self::Insights | Self::All)
    }
}

/// Which records the clustering view runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearSelection {
    /// The most recent year present in the data.
    Latest,
    /// One explicit year; it must be present in the data.
    Year(i32),
    /// Every record regardless of year.
    All,
}

/// User-selected, per-request parameters. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub view: View,
    pub year: YearSelection,
    /// Neighbor count for the classifier, validated against
    /// [`MIN_NEIGHBORS`]..=[`MAX_NEIGHBORS`] by the clustering analyzer.
    pub k: usize,
    pub show_raw: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            view: View::All,
            year: YearSelection::Latest,
            k: DEFAULT_NEIGHBORS,
            show_raw: false,
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and resolve derived values.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Self {
        let settings = Settings::parse_from(args);
        Self::resolve(settings)
    }

    /// Apply the `--debug` flag.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Whether reports should be emitted as JSON.
    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }

    /// Convert CLI values into the pure parameters of one analysis request.
    pub fn analysis_params(&self) -> AnalysisParams {
        let year = match (self.all_years, self.year) {
            (true, _) => YearSelection::All,
            (false, Some(y)) => YearSelection::Year(y),
            (false, None) => YearSelection::Latest,
        };
        AnalysisParams {
            view: View::from_name(&self.view).unwrap_or(View::All),
            year,
            k: usize::from(self.neighbors),
            show_raw: self.show_raw,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
