//! Two-dimensional projection of revenue records and a nearest-neighbor
//! classifier over the projected points.
//!
//! Pipeline per call: encode categories → standardize `{Amount, code}` →
//! principal components → k-NN on the projection. Everything is fitted on
//! the filtered records of that call; nothing is shared between calls.

use anyhow::anyhow;
use linfa::traits::{Fit, Transformer};
use linfa::Dataset;
use linfa_preprocessing::linear_scaling::LinearScaler;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2};
use osr_core::models::{ClusterPoint, CombinedDataset, Record};
use osr_core::settings::{MAX_NEIGHBORS, MIN_NEIGHBORS};
use osr_core::{OsrError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Number of projection dimensions produced.
pub const PROJECTION_DIMS: usize = 2;

// ── CategoryEncoding ──────────────────────────────────────────────────────────

/// Category label ↔ integer code table, built fresh for every analysis.
///
/// Codes follow first-seen order of the records it was fitted on, so the
/// same label may get different codes under different year filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryEncoding {
    labels: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CategoryEncoding {
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut encoding = Self::default();
        for label in labels {
            if !encoding.index.contains_key(label) {
                encoding.index.insert(label.to_string(), encoding.labels.len());
                encoding.labels.push(label.to_string());
            }
        }
        encoding
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ── Standardization ───────────────────────────────────────────────────────────

/// Centre every column and scale it to unit population variance.
///
/// A zero-variance column is only centred, so it comes out as zeros.
pub fn standardize(features: &Array2<f64>) -> Result<DMatrix<f64>> {
    let (rows, cols) = features.dim();
    let dataset = Dataset::new(features.clone(), Array1::<f64>::zeros(rows));
    let scaler = LinearScaler::standard()
        .fit(&dataset)
        .map_err(|e| OsrError::Other(anyhow!("standardizing features: {e}")))?;
    let scaled = scaler.transform(features.clone());

    Ok(DMatrix::from_fn(rows, cols, |i, j| scaled[[i, j]]))
}

// ── Principal components ──────────────────────────────────────────────────────

/// Principal axes of a centred matrix.
#[derive(Debug, Clone)]
pub struct Pca {
    /// One column per component, ordered by descending explained variance.
    pub components: DMatrix<f64>,
    pub explained_variance: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Fit on already-centred data (rows are samples).
    ///
    /// Each component's sign is fixed so its largest-magnitude loading is
    /// positive; equal magnitudes resolve to the first feature.
    pub fn fit(data: &DMatrix<f64>, n_components: usize) -> Result<Self> {
        let features = data.ncols();
        if n_components == 0 || n_components > features {
            return Err(OsrError::InvalidParameter(format!(
                "cannot extract {n_components} components from {features} features"
            )));
        }

        let n = data.nrows();
        let covariance = if n > 1 {
            (data.transpose() * data) / (n as f64 - 1.0)
        } else {
            DMatrix::zeros(features, features)
        };

        let eigen = SymmetricEigen::new(covariance);
        let mut order: Vec<usize> = (0..features).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let total: f64 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let mut components = DMatrix::zeros(features, n_components);
        let mut explained_variance = Vec::with_capacity(n_components);
        let mut explained_variance_ratio = Vec::with_capacity(n_components);

        for (slot, &idx) in order.iter().take(n_components).enumerate() {
            let mut axis = eigen.eigenvectors.column(idx).clone_owned();
            let mut dominant = 0;
            for (i, v) in axis.iter().enumerate() {
                if v.abs() > axis[dominant].abs() + 1e-12 {
                    dominant = i;
                }
            }
            if axis[dominant] < 0.0 {
                axis.neg_mut();
            }
            components.set_column(slot, &axis);

            let variance = eigen.eigenvalues[idx].max(0.0);
            explained_variance.push(variance);
            explained_variance_ratio.push(if total > 0.0 { variance / total } else { 0.0 });
        }

        Ok(Self {
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    pub fn transform(&self, data: &DMatrix<f64>) -> DMatrix<f64> {
        data * &self.components
    }
}

// ── Nearest neighbors ─────────────────────────────────────────────────────────

/// Majority-vote k-nearest-neighbor classifier over 2-D points.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    points: Vec<[f64; 2]>,
    labels: Vec<usize>,
}

impl KnnClassifier {
    pub fn fit(k: usize, points: Vec<[f64; 2]>, labels: Vec<usize>) -> Result<Self> {
        if k == 0 {
            return Err(OsrError::InvalidParameter(
                "neighbor count must be at least 1".to_string(),
            ));
        }
        if points.len() != labels.len() {
            return Err(OsrError::InvalidParameter(format!(
                "{} points but {} labels",
                points.len(),
                labels.len()
            )));
        }
        Ok(Self { k, points, labels })
    }

    /// Class of `query`, consulting at most `min(k, n)` neighbors.
    pub fn predict(&self, query: [f64; 2]) -> Option<usize> {
        self.vote(query, None)
    }

    /// Share of points whose class is predicted correctly from the others,
    /// with `min(k, n - 1)` neighbors. `None` below two points.
    pub fn leave_one_out_accuracy(&self) -> Option<f64> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let hits = (0..n)
            .filter(|&i| self.vote(self.points[i], Some(i)) == Some(self.labels[i]))
            .count();
        Some(hits as f64 / n as f64)
    }

    /// Distance ties resolve to the lower point index; vote ties resolve to
    /// the smaller class code.
    fn vote(&self, query: [f64; 2], exclude: Option<usize>) -> Option<usize> {
        let mut neighbors: Vec<(f64, usize)> = self
            .points
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .map(|(i, p)| (euclidean(query, *p), i))
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut votes: BTreeMap<usize, usize> = BTreeMap::new();
        for &(_, i) in neighbors.iter().take(self.k) {
            *votes.entry(self.labels[i]).or_insert(0) += 1;
        }

        let mut best: Option<(usize, usize)> = None;
        for (label, count) in votes {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }
}

fn euclidean(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

// ── Clustering analysis ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ClusterAnalysis {
    /// Year filter applied, `None` for every year.
    pub year: Option<i32>,
    pub k: usize,
    pub encoding: CategoryEncoding,
    /// One point per filtered record, in dataset order.
    pub points: Vec<ClusterPoint>,
    pub explained_variance_ratio: Vec<f64>,
    pub loo_accuracy: Option<f64>,
}

/// Project the records of `year` (or every record) and fit the classifier.
pub fn cluster(dataset: &CombinedDataset, year: Option<i32>, k: usize) -> Result<ClusterAnalysis> {
    if !(MIN_NEIGHBORS..=MAX_NEIGHBORS).contains(&k) {
        return Err(OsrError::InvalidParameter(format!(
            "neighbor count {k} is outside {MIN_NEIGHBORS}..={MAX_NEIGHBORS}"
        )));
    }

    let records: Vec<&Record> = match year {
        Some(y) if !dataset.contains_year(y) => return Err(OsrError::YearNotPresent(y)),
        Some(y) => dataset.records_for_year(y),
        None => dataset.records.iter().collect(),
    };
    if records.is_empty() {
        return Err(OsrError::EmptySelection);
    }

    let encoding = CategoryEncoding::fit(records.iter().map(|r| r.description.as_str()));
    let codes: Vec<usize> = records
        .iter()
        .map(|r| encoding.code(&r.description).unwrap_or_default())
        .collect();

    let features = Array2::from_shape_fn((records.len(), 2), |(i, j)| match j {
        0 => records[i].amount,
        _ => codes[i] as f64,
    });
    let standardized = standardize(&features)?;
    let pca = Pca::fit(&standardized, PROJECTION_DIMS)?;
    let projected = pca.transform(&standardized);

    let points: Vec<ClusterPoint> = records
        .iter()
        .enumerate()
        .map(|(i, r)| ClusterPoint {
            dim1: projected[(i, 0)],
            dim2: projected[(i, 1)],
            label: r.description.clone(),
            code: codes[i],
            year: r.year,
            amount: r.amount,
        })
        .collect();

    let classifier = KnnClassifier::fit(
        k,
        points.iter().map(|p| [p.dim1, p.dim2]).collect(),
        codes,
    )?;
    let loo_accuracy = classifier.leave_one_out_accuracy();

    debug!(
        "Clustered {} records ({} categories, k={k}, year={year:?})",
        points.len(),
        encoding.len()
    );

    Ok(ClusterAnalysis {
        year,
        k,
        encoding,
        points,
        explained_variance_ratio: pca.explained_variance_ratio,
        loo_accuracy,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
