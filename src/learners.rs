//! Scaling, grouping and trend-fitting capabilities.
//!
//! Each capability is fitted inside a single call and hands back plain
//! values; nothing fitted is stored on `self`. That keeps every
//! implementation `Send + Sync` so one engine can serve concurrent requests.

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};

const EPSILON: f64 = 1e-12;

/// Zero-mean / unit-variance rescaling per column.
pub trait FeatureScaler: Send + Sync {
    fn fit_transform(&self, features: &Array2<f64>) -> Array2<f64>;
}

/// Unsupervised partitioning of feature rows into group ids.
pub trait StudentGrouper: Send + Sync {
    fn n_groups(&self) -> usize;
    fn fit_predict(&self, features: &Array2<f64>) -> Result<Array1<usize>>;
}

/// Straight-line fit of targets against a single regressor.
pub trait TrendFitter: Send + Sync {
    fn fit(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<TrendFit>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Standardizes with the population standard deviation. Constant columns
/// are centred but left unscaled.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl FeatureScaler for StandardScaler {
    fn fit_transform(&self, features: &Array2<f64>) -> Array2<f64> {
        if features.nrows() == 0 {
            return features.clone();
        }
        let means = match features.mean_axis(Axis(0)) {
            Some(means) => means,
            None => return features.clone(),
        };
        let scales = features
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std.abs() < EPSILON { 1.0 } else { std });
        (features - &means) / &scales
    }
}

/// k-means over standardized rows with a fixed seed, so identical input
/// always yields identical groups.
#[derive(Debug, Clone)]
pub struct KMeansGrouper {
    pub n_clusters: usize,
    pub seed: u64,
    pub max_iterations: u64,
    pub tolerance: f64,
}

impl Default for KMeansGrouper {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

impl StudentGrouper for KMeansGrouper {
    fn n_groups(&self) -> usize {
        self.n_clusters
    }

    fn fit_predict(&self, features: &Array2<f64>) -> Result<Array1<usize>> {
        if self.n_clusters == 0 {
            return Err(Error::degenerate("k-means needs at least one cluster"));
        }
        if features.nrows() < self.n_clusters {
            return Err(Error::degenerate(format!(
                "{} rows cannot form {} clusters",
                features.nrows(),
                self.n_clusters
            )));
        }

        // With fewer distinct points than clusters the seeding step has no
        // spread to sample from; each distinct point becomes its own group.
        let distinct = distinct_row_labels(features);
        let distinct_count = distinct.iter().max().map_or(0, |max| max + 1);
        if distinct_count < self.n_clusters {
            return Ok(distinct);
        }

        let dataset = DatasetBase::from(features.clone());
        let rng = ChaCha8Rng::seed_from_u64(self.seed);
        let model = KMeans::params_with_rng(self.n_clusters, rng)
            .max_n_iterations(self.max_iterations)
            .tolerance(self.tolerance)
            .fit(&dataset)
            .map_err(|err| Error::degenerate(format!("k-means did not fit: {err}")))?;

        Ok(model.predict(features))
    }
}

/// Labels each row by the first earlier row it equals, numbering distinct
/// rows in order of first appearance.
fn distinct_row_labels(features: &Array2<f64>) -> Array1<usize> {
    let mut representatives: Vec<usize> = Vec::new();
    let mut labels = Array1::zeros(features.nrows());

    for (idx, row) in features.outer_iter().enumerate() {
        let existing = representatives.iter().position(|&rep| {
            features
                .row(rep)
                .iter()
                .zip(row.iter())
                .all(|(a, b)| (a - b).abs() < 1e-9)
        });
        labels[idx] = match existing {
            Some(label) => label,
            None => {
                representatives.push(idx);
                representatives.len() - 1
            }
        };
    }

    labels
}

/// Ordinary least squares through `linfa-linear`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrendFitter;

impl TrendFitter for LinearTrendFitter {
    fn fit(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<TrendFit> {
        if x.len() != y.len() {
            return Err(Error::degenerate(format!(
                "regressor has {} values but target has {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(Error::degenerate("a trend needs at least two points"));
        }
        if x.std(0.0) < EPSILON {
            return Err(Error::degenerate("regressor has no variance"));
        }

        let records = x.clone().insert_axis(Axis(1));
        let dataset = Dataset::new(records.clone(), y.clone());
        let model = LinearRegression::default()
            .fit(&dataset)
            .map_err(|err| Error::degenerate(format!("linear fit failed: {err}")))?;

        let fitted: Array1<f64> = model.predict(&records);
        Ok(TrendFit {
            slope: model.params()[0],
            intercept: model.intercept(),
            r_squared: r_squared(y, &fitted),
        })
    }
}

/// Coefficient of determination. A constant target that is reproduced
/// exactly counts as a perfect fit.
pub fn r_squared(actual: &Array1<f64>, fitted: &Array1<f64>) -> f64 {
    let mean = actual.mean().unwrap_or(0.0);
    let ss_res: f64 = actual
        .iter()
        .zip(fitted.iter())
        .map(|(a, f)| (a - f).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot < EPSILON {
        return if ss_res < 1e-9 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn scaler_centres_and_scales_columns() {
        let features = array![[1.0, 5.0], [3.0, 5.0], [5.0, 5.0]];
        let scaled = StandardScaler.fit_transform(&features);
        let means = scaled.mean_axis(Axis(0)).unwrap();
        assert!(means.iter().all(|m| m.abs() < 1e-9));
        let std = scaled.column(0).std(0.0);
        assert!((std - 1.0).abs() < 1e-9);
        // constant column stays finite
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn linear_fit_recovers_slope() {
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![50.0, 55.0, 60.0, 65.0];
        let fit = LinearTrendFitter.fit(&x, &y).unwrap();
        assert!((fit.slope - 5.0).abs() < 1e-6);
        assert!((fit.intercept - 50.0).abs() < 1e-6);
        assert!((fit.r_squared - 1.0).abs() < 1e-6);
    }

    #[test]
    fn linear_fit_needs_two_points() {
        let err = LinearTrendFitter
            .fit(&array![0.0], &array![70.0])
            .unwrap_err();
        assert!(matches!(err, Error::ComputationDegenerate(_)));
    }

    #[test]
    fn constant_target_is_a_perfect_fit() {
        assert_eq!(r_squared(&array![70.0, 70.0], &array![70.0, 70.0]), 1.0);
    }

    #[test]
    fn kmeans_separates_distant_blobs() {
        let features: Array2<f64> = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [10.0, 10.0],
            [10.1, 10.0],
            [-10.0, 10.0],
            [-10.1, 10.0],
        ];
        let labels = KMeansGrouper::default().fit_predict(&features).unwrap();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[4], labels[5]);
        assert!(labels.iter().all(|&label| label < 3));
    }

    #[test]
    fn identical_rows_fall_back_to_distinct_labels() {
        let features: Array2<f64> = array![[1.0, 1.0], [1.0, 1.0], [2.0, 2.0]];
        let labels = KMeansGrouper::default().fit_predict(&features).unwrap();
        assert_eq!(labels.to_vec(), vec![0, 0, 1]);
    }

    #[test]
    fn kmeans_rejects_too_few_rows() {
        let features: Array2<f64> = array![[1.0], [2.0]];
        assert!(KMeansGrouper::default().fit_predict(&features).is_err());
    }
}
