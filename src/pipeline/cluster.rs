//! K-means clustering fitted on train and applied to every partition

use anyhow::Result;
use log::{debug, info};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::frame::{dense_values, require_columns, with_replaced_column};
use super::split::{DataSplit, Partition};

/// Name of the integer label column added by [`ClusterModel::encode`]
pub const CLUSTER_COLUMN: &str = "cluster";

/// K-means settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Random seed for k-means++ seeding
    pub seed: u64,
    /// Independent restarts; the lowest-inertia run wins
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart
    pub max_iter: usize,
    /// Convergence threshold on the summed squared centroid shift
    pub tol: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 4,
            seed: 24,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
        }
    }
}

/// Centroids fitted on train rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterModel {
    pub features: Vec<String>,
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squared distances on the fitting rows
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart
    pub n_iter: usize,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index and squared distance of the nearest centroid, ties to the lowest index
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (label, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (label, d);
        }
    }
    best
}

/// Row-major feature matrix; nulls and non-finite values are rejected
fn feature_rows(df: &DataFrame, features: &[String]) -> Result<Vec<Vec<f64>>> {
    require_columns(df, features)?;
    let columns: Vec<Vec<f64>> = features
        .iter()
        .map(|f| dense_values(df, f))
        .collect::<Result<_>>()?;

    Ok((0..df.height())
        .map(|row| columns.iter().map(|c| c[row]).collect())
        .collect())
}

/// k-means++ seeding: each new centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen centroid
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![data[rng.gen_range(0..data.len())].clone()];
    let mut distances: Vec<f64> = data
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let next = if total > 0.0 {
            let threshold = rng.gen_range(0.0..total);
            let mut cumsum = 0.0;
            distances
                .iter()
                .position(|&d| {
                    cumsum += d;
                    cumsum > threshold
                })
                .unwrap_or(data.len() - 1)
        } else {
            // Every point coincides with a centroid already.
            rng.gen_range(0..data.len())
        };

        centroids.push(data[next].clone());
        for (d, p) in distances.iter_mut().zip(data) {
            *d = d.min(squared_distance(p, &centroids[centroids.len() - 1]));
        }
    }
    centroids
}

/// One Lloyd run from k-means++ seeds: `(centroids, inertia, iterations)`
fn lloyd(data: &[Vec<f64>], config: &KMeansConfig, rng: &mut StdRng) -> (Vec<Vec<f64>>, f64, usize) {
    let k = config.k;
    let dims = data[0].len();
    let mut centroids = kmeans_plus_plus(data, k, rng);
    let mut labels = vec![0usize; data.len()];
    let mut iterations = 0;

    for iter in 0..config.max_iter {
        iterations = iter + 1;
        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        let mut worst: Option<(usize, f64)> = None;

        for (row, point) in data.iter().enumerate() {
            let (label, d) = nearest(point, &centroids);
            labels[row] = label;
            counts[label] += 1;
            for (s, x) in sums[label].iter_mut().zip(point) {
                *s += x;
            }
            if worst.map_or(true, |(_, wd)| d > wd) {
                worst = Some((row, d));
            }
        }

        let mut shift = 0.0;
        for label in 0..k {
            let updated: Vec<f64> = if counts[label] == 0 {
                // Empty cluster: restart it on the point farthest from its centroid.
                let (row, _) = worst.unwrap_or((0, 0.0));
                data[row].clone()
            } else {
                sums[label].iter().map(|s| s / counts[label] as f64).collect()
            };
            shift += squared_distance(&updated, &centroids[label]);
            centroids[label] = updated;
        }

        if shift <= config.tol {
            break;
        }
    }

    let inertia = data.iter().map(|p| nearest(p, &centroids).1).sum();
    (centroids, inertia, iterations)
}

impl ClusterModel {
    /// Fit k centroids on `train`'s feature columns
    pub fn fit(train: &DataFrame, features: &[String], config: &KMeansConfig) -> Result<Self> {
        if config.k == 0 {
            return Err(PipelineError::InvalidConfig("k must be at least 1".to_string()).into());
        }
        if features.is_empty() {
            return Err(
                PipelineError::InvalidConfig("clustering needs at least one feature".to_string())
                    .into(),
            );
        }
        if train.height() == 0 {
            return Err(PipelineError::EmptyPartition {
                stage: "clustering",
                partition: Partition::Train,
            }
            .into());
        }

        let data = feature_rows(train, features)?;
        if data.len() < config.k {
            anyhow::bail!(
                "Cannot fit {} clusters on {} train rows",
                config.k,
                data.len()
            );
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut best: Option<(Vec<Vec<f64>>, f64, usize)> = None;
        for _ in 0..config.n_init.max(1) {
            let run = lloyd(&data, config, &mut rng);
            if best.as_ref().map_or(true, |b| run.1 < b.1) {
                best = Some(run);
            }
        }

        let (centroids, inertia, n_iter) = best.ok_or_else(|| anyhow::anyhow!("k-means produced no run"))?;
        info!(
            "fitted {} clusters on {} rows (inertia {:.4}, {} iterations)",
            config.k,
            data.len(),
            inertia,
            n_iter
        );

        Ok(Self {
            features: features.to_vec(),
            centroids,
            inertia,
            n_iter,
        })
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Label of the nearest centroid; ties go to the lowest label
    pub fn assign(&self, point: &[f64]) -> u32 {
        nearest(point, &self.centroids).0 as u32
    }

    /// Cluster label for every row of `df`
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<u32>> {
        Ok(feature_rows(df, &self.features)?
            .iter()
            .map(|p| self.assign(p))
            .collect())
    }

    /// Indicator column names: one per label except the reference label 0
    pub fn indicator_columns(&self) -> Vec<String> {
        (1..self.k())
            .map(|label| format!("{}_{}", CLUSTER_COLUMN, label))
            .collect()
    }

    /// Add the `cluster` label column and one 0/1 indicator per non-reference label.
    ///
    /// The indicator set depends only on the fitted `k`, so every partition
    /// gets the same columns even when some labels never occur in it.
    pub fn encode(&self, df: &DataFrame) -> Result<DataFrame> {
        let labels = self.predict(df)?;
        let mut out = with_replaced_column(
            df,
            Column::new(CLUSTER_COLUMN.into(), labels.clone()),
        )?;

        for (label, name) in (1..self.k() as u32).zip(self.indicator_columns()) {
            let indicator: Vec<u8> = labels.iter().map(|&l| u8::from(l == label)).collect();
            out.with_column(Column::new(name.as_str().into(), indicator))?;
        }
        Ok(out)
    }
}

/// Fit on train, then label and encode all three partitions with the same centroids
pub fn assign_clusters(
    split: &DataSplit,
    features: &[String],
    config: &KMeansConfig,
) -> Result<(DataSplit, ClusterModel)> {
    split.require_rows("clustering")?;
    let model = ClusterModel::fit(&split.train, features, config)?;
    let encoded = split.try_map(|partition, df| {
        debug!("encoding clusters for {} ({} rows)", partition, df.height());
        model.encode(df)
    })?;
    Ok((encoded, model))
}

/// Inertia for each k in `k_range`, fitted in parallel on the same rows
pub fn inertia_curve(
    train: &DataFrame,
    features: &[String],
    k_range: std::ops::RangeInclusive<usize>,
    config: &KMeansConfig,
) -> Result<Vec<(usize, f64)>> {
    let ks: Vec<usize> = k_range.collect();
    ks.par_iter()
        .map(|&k| {
            let cfg = KMeansConfig {
                k,
                ..config.clone()
            };
            ClusterModel::fit(train, features, &cfg).map(|m| (k, m.inertia))
        })
        .collect()
}
