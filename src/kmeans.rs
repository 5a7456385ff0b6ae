use std::collections::{BTreeMap, HashSet};

use linfa::prelude::Predict;
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_clustering::{KMeans, KMeansInit};
use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::{FraudError, Result};
use crate::features::{assemble, standardize, FeatureVector, FEATURE_DIM};
use crate::window::EnrichedRecord;

pub const N_CLUSTERS: usize = 2;
pub const DEFAULT_SEED: u64 = 1;
pub const DEFAULT_MAX_ITERATIONS: u64 = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    /// Seed for picking the first initial centroid
    pub seed: u64,
    pub max_iterations: u64,
    /// Centroid shift below which iteration stops. This ends the loop on
    /// movement rather than on unchanged assignments, so keep it small
    /// relative to the feature scale; `max_iterations` bounds the rest.
    pub tolerance: f64,
    /// Z-score feature columns before clustering
    pub standardize: bool,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            standardize: false,
        }
    }
}

/// Cluster label of every transaction, with the fitted centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    labels: BTreeMap<i64, usize>,
    sizes: [usize; N_CLUSTERS],
    centroids: Array2<f64>,
}

impl ClusterAssignment {
    pub fn label(&self, transaction_id: i64) -> Option<usize> {
        self.labels.get(&transaction_id).copied()
    }

    pub fn sizes(&self) -> [usize; N_CLUSTERS] {
        self.sizes
    }

    /// One row per cluster, in the (possibly standardized) clustering space.
    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    fn from_labels(
        records: &[EnrichedRecord],
        labels: impl IntoIterator<Item = usize>,
        centroids: Array2<f64>,
    ) -> Self {
        let mut sizes = [0; N_CLUSTERS];
        let labels = records
            .iter()
            .zip(labels)
            .map(|(record, label)| {
                sizes[label] += 1;
                (record.record.transaction_id, label)
            })
            .collect();
        Self {
            labels,
            sizes,
            centroids,
        }
    }
}

/// Per-cluster summary used for the run report.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    pub label: usize,
    pub size: usize,
    pub unique_customers: usize,
    /// Mean of each raw feature over the cluster's members
    pub avg_features: [f64; FEATURE_DIM],
    pub anomalous: bool,
}

// Fit k=2 k-means over every record's feature vector.
// Steps:
// 1. Build the feature matrix, optionally standardized
// 2. Seed the two initial centroids
// 3. Run Lloyd's iterations and label every record
pub fn classify(records: &[EnrichedRecord], params: &ClusterParams) -> Result<ClusterAssignment> {
    if records.len() < N_CLUSTERS {
        return Err(FraudError::InsufficientData {
            needed: N_CLUSTERS,
            have: records.len(),
        });
    }

    let mut data = assemble(records);
    if params.standardize {
        standardize(&mut data);
    }

    let init = match initial_centroids(&data, params.seed) {
        Some(init) => init,
        None => {
            warn!(
                records = records.len(),
                "all feature vectors coincide; assigning every record to cluster 0"
            );
            let mut centroids = Array2::zeros((N_CLUSTERS, data.ncols()));
            for mut row in centroids.axis_iter_mut(Axis(0)) {
                row.assign(&data.row(0));
            }
            return Ok(ClusterAssignment::from_labels(
                records,
                std::iter::repeat(0),
                centroids,
            ));
        }
    };

    let dataset = Dataset::from(data);
    let model = KMeans::params(N_CLUSTERS)
        .n_runs(1)
        .init_method(KMeansInit::Precomputed(init))
        .max_n_iterations(params.max_iterations)
        .tolerance(params.tolerance)
        .fit(&dataset)
        .map_err(|e| FraudError::Clustering(e.to_string()))?;

    let labels = model.predict(&dataset);
    let assignment =
        ClusterAssignment::from_labels(records, labels.iter().copied(), model.centroids().clone());

    debug!(
        sizes = ?assignment.sizes(),
        centroids = ?assignment.centroids(),
        seed = params.seed,
        "k-means fit finished"
    );
    Ok(assignment)
}

// First centroid is a seeded random row; second is the row farthest from it,
// lowest index on ties. None when every row equals the first.
fn initial_centroids(data: &Array2<f64>, seed: u64) -> Option<Array2<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let first = rng.gen_range(0..data.nrows());
    let anchor = data.row(first);

    let mut farthest = first;
    let mut best = 0.0;
    for (idx, row) in data.axis_iter(Axis(0)).enumerate() {
        let distance = squared_distance(anchor, row);
        if distance > best {
            best = distance;
            farthest = idx;
        }
    }
    if best == 0.0 {
        return None;
    }

    let mut init = Array2::zeros((N_CLUSTERS, data.ncols()));
    init.row_mut(0).assign(&anchor);
    init.row_mut(1).assign(&data.row(farthest));
    Some(init)
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

pub fn profile_clusters(
    records: &[EnrichedRecord],
    assignment: &ClusterAssignment,
    anomalous: usize,
) -> Vec<ClusterProfile> {
    let mut sums = [[0.0; FEATURE_DIM]; N_CLUSTERS];
    let mut customers: [HashSet<i64>; N_CLUSTERS] = Default::default();

    for record in records {
        let Some(label) = assignment.label(record.record.transaction_id) else {
            continue;
        };
        for (sum, value) in sums[label].iter_mut().zip(FeatureVector::from(record).values()) {
            *sum += value;
        }
        customers[label].insert(record.record.customer_id);
    }

    (0..N_CLUSTERS)
        .map(|label| {
            let size = assignment.sizes()[label];
            let avg_features = sums[label].map(|sum| if size > 0 { sum / size as f64 } else { 0.0 });
            ClusterProfile {
                label,
                size,
                unique_customers: customers[label].len(),
                avg_features,
                anomalous: anomalous == label,
            }
        })
        .collect()
}
