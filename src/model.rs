//! K-Means segmentation of observation tables

use crate::data::ObservationTable;
use crate::error::SegmentError;
use linfa::prelude::*;
use linfa_clustering::{KMeans, KMeansInit};
use linfa_nn::distance::L2Dist;
use linfa_preprocessing::linear_scaling::LinearScaler;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Segmenter configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    /// Number of clusters
    pub k: usize,
    /// Seed for centroid initialization
    pub seed: u64,
    /// Maximum Lloyd iterations per run
    pub max_iters: usize,
    /// Convergence tolerance on centroid movement
    pub tolerance: f64,
    /// Independent initializations; the run with the lowest inertia wins
    pub n_runs: usize,
    /// Z-score each feature before clustering
    pub standardize: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            k: 12,
            seed: 42,
            max_iters: 300,
            tolerance: 1e-4,
            n_runs: 10,
            standardize: false,
        }
    }
}

impl SegmentConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_n_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = n_runs;
        self
    }

    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    fn validate(&self, rows: usize) -> Result<(), SegmentError> {
        if self.k == 0 {
            return Err(SegmentError::InvalidK(self.k));
        }
        if rows < self.k {
            return Err(SegmentError::TooFewRows { rows, k: self.k });
        }
        if self.max_iters == 0 {
            return Err(SegmentError::InvalidParams(
                "max_iters must be at least 1".to_string(),
            ));
        }
        if self.n_runs == 0 {
            return Err(SegmentError::InvalidParams(
                "n_runs must be at least 1".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(SegmentError::InvalidParams(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Observation table together with its fitted cluster assignment
#[derive(Debug)]
pub struct Segmentation {
    /// The clustered table, raw counts untouched
    pub table: ObservationTable,
    /// Cluster label per row, each in `[0, k)`
    pub labels: Array1<usize>,
    /// Centroids in clustering space (standardized when `config.standardize`)
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    /// Configuration the model was fitted with
    pub config: SegmentConfig,
    model: KMeans<f64, L2Dist>,
    scaler: Option<LinearScaler<f64>>,
    clustered: Array2<f64>,
}

impl Segmentation {
    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Member count per cluster id
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in self.labels.iter() {
            sizes[label] += 1;
        }
        sizes
    }

    /// Assign a raw feature vector to its nearest centroid
    pub fn predict(&self, features: &[f64]) -> crate::Result<usize> {
        let expected = self.table.n_features();
        if features.len() != expected {
            return Err(SegmentError::DimensionMismatch {
                expected,
                actual: features.len(),
            }
            .into());
        }

        let mut input = Array2::from_shape_vec((1, expected), features.to_vec())?;
        if let Some(scaler) = &self.scaler {
            input = scaler.transform(input);
        }

        let labels = self.model.predict(&input);
        Ok(labels[0])
    }

    /// Mean silhouette coefficient over the first `sample_size` rows
    pub fn silhouette_sample(&self, sample_size: usize) -> f64 {
        silhouette_sample(self.clustered.view(), &self.labels, self.k(), sample_size)
    }
}

/// Partition the table's rows into `config.k` clusters
///
/// The table is consumed and handed back inside the returned `Segmentation`.
///
/// # Arguments
/// * `table` - Loaded observations (features only)
/// * `config` - Cluster count, seed and convergence settings
///
/// # Returns
/// * `Segmentation` with one label per row, deterministic for a fixed seed
pub fn segment(table: ObservationTable, config: &SegmentConfig) -> crate::Result<Segmentation> {
    config.validate(table.n_rows())?;

    let n_samples = table.n_rows();
    let (clustered, scaler) = if config.standardize {
        let dataset = Dataset::new(table.features.clone(), Array1::<usize>::zeros(n_samples));
        let scaler = LinearScaler::standard().fit(&dataset)?;
        (scaler.transform(table.features.clone()), Some(scaler))
    } else {
        warn!("Clustering on unscaled features; pass --standardize to z-score them first");
        (table.features.clone(), None)
    };

    debug!(
        "Fitting K-Means: k={}, seed={}, runs={}, max_iters={}, tolerance={}",
        config.k, config.seed, config.n_runs, config.max_iters, config.tolerance
    );

    let dataset = Dataset::new(clustered.clone(), Array1::<usize>::zeros(n_samples));
    let rng = StdRng::seed_from_u64(config.seed);
    let model = KMeans::params_with(config.k, rng, L2Dist)
        .init_method(KMeansInit::KMeansPlusPlus)
        .n_runs(config.n_runs)
        .max_n_iterations(config.max_iters as u64)
        .tolerance(config.tolerance)
        .fit(&dataset)?;

    let labels = model.predict(&clustered);
    let centroids = model.centroids().clone();

    // Fewer distinct rows than k leaves some centroids without members
    let occupied = count_occupied(&labels, config.k);
    if occupied < config.k {
        warn!("Found {} distinct clusters, fewer than k={}", occupied, config.k);
    }

    let inertia = compute_inertia(clustered.view(), &labels, centroids.view());

    debug!("K-Means converged with inertia {:.2}", inertia);

    Ok(Segmentation {
        table,
        labels,
        centroids,
        inertia,
        config: config.clone(),
        model,
        scaler,
        clustered,
    })
}

/// Number of cluster ids that received at least one row
fn count_occupied(labels: &Array1<usize>, k: usize) -> usize {
    let mut seen = vec![false; k];
    for &label in labels.iter() {
        seen[label] = true;
    }
    seen.into_iter().filter(|&occupied| occupied).count()
}

/// Within-cluster sum of squared distances
fn compute_inertia(
    features: ArrayView2<f64>,
    labels: &Array1<usize>,
    centroids: ArrayView2<f64>,
) -> f64 {
    features
        .outer_iter()
        .zip(labels.iter())
        .map(|(point, &cluster)| squared_distance(&point, &centroids.row(cluster)))
        .sum()
}

fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn silhouette_sample(
    features: ArrayView2<f64>,
    labels: &Array1<usize>,
    n_clusters: usize,
    sample_size: usize,
) -> f64 {
    let n_samples = features.nrows().min(sample_size);
    if n_samples < 2 {
        return 0.0;
    }

    let mut silhouette_sum = 0.0;

    for i in 0..n_samples {
        let point = features.row(i);
        let cluster_label = labels[i];

        // a(i): mean distance within own cluster, b(i): nearest other cluster
        let mut same_cluster = (0.0, 0usize);
        let mut other_clusters = vec![(0.0, 0usize); n_clusters];

        for j in 0..n_samples {
            if i == j {
                continue;
            }
            let distance = squared_distance(&point, &features.row(j)).sqrt();
            let slot = if labels[j] == cluster_label {
                &mut same_cluster
            } else {
                &mut other_clusters[labels[j]]
            };
            slot.0 += distance;
            slot.1 += 1;
        }

        let a_i = if same_cluster.1 == 0 {
            0.0
        } else {
            same_cluster.0 / same_cluster.1 as f64
        };

        let b_i = other_clusters
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(sum, count)| sum / *count as f64)
            .fold(f64::INFINITY, f64::min);

        let silhouette_i = if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
            0.0
        } else {
            (b_i - a_i) / a_i.max(b_i)
        };

        silhouette_sum += silhouette_i;
    }

    silhouette_sum / n_samples as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::rank_clusters;
    use ndarray::array;

    fn create_test_table() -> ObservationTable {
        // Two well separated groups: chatter-heavy and politics-heavy users
        let features = array![
            [9.0, 1.0, 0.0],
            [8.0, 0.0, 1.0],
            [10.0, 1.0, 1.0],
            [9.0, 2.0, 0.0],
            [0.0, 1.0, 9.0],
            [1.0, 0.0, 8.0],
            [0.0, 2.0, 10.0],
            [1.0, 1.0, 9.0],
        ];
        let ids = (1..=8).map(|i| format!("u{}", i)).collect();
        ObservationTable::new(
            vec!["chatter".into(), "sports".into(), "politics".into()],
            ids,
            features,
        )
        .unwrap()
    }

    #[test]
    fn test_segment() {
        let seg = segment(create_test_table(), &SegmentConfig::new(2)).unwrap();

        assert_eq!(seg.k(), 2);
        assert_eq!(seg.labels.len(), 8);
        assert_eq!(seg.centroids.shape(), &[2, 3]);
        assert!(seg.labels.iter().all(|&l| l < 2));

        // The two groups must not share a label
        assert!(seg.labels.slice(ndarray::s![..4]).iter().all(|&l| l == seg.labels[0]));
        assert!(seg.labels.slice(ndarray::s![4..]).iter().all(|&l| l == seg.labels[4]));
        assert_ne!(seg.labels[0], seg.labels[4]);
    }

    #[test]
    fn test_segment_is_deterministic() {
        let config = SegmentConfig::new(3).with_seed(7);
        let first = segment(create_test_table(), &config).unwrap();
        let second = segment(create_test_table(), &config).unwrap();

        assert_eq!(first.labels, second.labels);
        assert_eq!(first.centroids, second.centroids);
    }

    #[test]
    fn test_cluster_sizes_partition_rows() {
        let seg = segment(create_test_table(), &SegmentConfig::new(3)).unwrap();
        let sizes = seg.cluster_sizes();

        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes.iter().sum::<usize>(), 8);
    }

    #[test]
    fn test_k_exceeds_rows() {
        let err = segment(create_test_table(), &SegmentConfig::new(9)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SegmentError>(),
            Some(&SegmentError::TooFewRows { rows: 8, k: 9 })
        );
    }

    #[test]
    fn test_invalid_config() {
        let err = segment(create_test_table(), &SegmentConfig::new(0)).unwrap_err();
        assert_eq!(err.downcast_ref::<SegmentError>(), Some(&SegmentError::InvalidK(0)));

        let config = SegmentConfig::new(2).with_tolerance(0.0);
        assert!(segment(create_test_table(), &config).is_err());

        let config = SegmentConfig::new(2).with_n_runs(0);
        assert!(segment(create_test_table(), &config).is_err());
    }

    #[test]
    fn test_predict() {
        let seg = segment(create_test_table(), &SegmentConfig::new(2)).unwrap();

        assert_eq!(seg.predict(&[9.5, 1.0, 0.5]).unwrap(), seg.labels[0]);
        assert_eq!(seg.predict(&[0.5, 1.0, 9.5]).unwrap(), seg.labels[4]);
        assert!(seg.predict(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_standardized_segment() {
        let config = SegmentConfig::new(2).with_standardize(true);
        let seg = segment(create_test_table(), &config).unwrap();

        assert_ne!(seg.labels[0], seg.labels[4]);
        assert_eq!(seg.predict(&[9.5, 1.0, 0.5]).unwrap(), seg.labels[0]);
        // Raw counts are kept for profiling
        assert_eq!(seg.table.features[[0, 0]], 9.0);
    }

    #[test]
    fn test_duplicate_rows_leave_clusters_empty() {
        let features = Array2::from_elem((5, 2), 1.0);
        let ids = (0..5).map(|i| format!("u{}", i)).collect();
        let table = ObservationTable::new(vec!["chatter".into(), "sports".into()], ids, features)
            .unwrap();

        let seg = segment(table, &SegmentConfig::new(3)).unwrap();

        assert!(rank_clusters(&seg).len() < 3);
        assert_eq!(count_occupied(&seg.labels, 3), rank_clusters(&seg).len());
        assert_eq!(seg.cluster_sizes().iter().sum::<usize>(), 5);
    }

    #[test]
    fn test_count_occupied() {
        assert_eq!(count_occupied(&array![1, 0, 1, 0], 4), 2);
        assert_eq!(count_occupied(&array![0, 1, 2], 3), 3);
    }

    #[test]
    fn test_inertia_and_silhouette() {
        let seg = segment(create_test_table(), &SegmentConfig::new(2)).unwrap();

        assert!(seg.inertia >= 0.0);
        assert!(seg.inertia.is_finite());
        assert!(seg.silhouette_sample(100) > 0.5);
    }
}
