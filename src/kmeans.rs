// K-Means clustering with k-means++ initialization (Lloyd iterations)

use ndarray::{Array2, ArrayView1, Axis};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LabError, Result};
use crate::sampling::seeded_rng;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    /// Convergence tolerance, relative to the mean feature variance
    pub tol: f64,
    /// Number of seeded restarts; the lowest inertia wins
    pub n_init: usize,
    pub seed: Option<u64>,
}

/// Fitted model
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster id per sample
    pub labels: Vec<usize>,
    /// n_clusters x n_features
    pub centroids: Array2<f64>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        KMeans {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 1,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn fit(&self, x: &Array2<f64>) -> Result<KMeansFit> {
        let n_samples = x.nrows();
        if self.n_clusters == 0 {
            return Err(LabError::InvalidInput(
                "k-means needs at least one cluster".to_string(),
            ));
        }
        if n_samples < self.n_clusters {
            return Err(LabError::InvalidInput(format!(
                "k-means with {} clusters needs at least {} samples, got {}",
                self.n_clusters, self.n_clusters, n_samples
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LabError::Numerical(
                "k-means input contains non-finite values".to_string(),
            ));
        }

        let variance = x.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0);
        let tol = self.tol * variance;

        let mut rng = seeded_rng(self.seed);
        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.n_init.max(1) {
            let fit = self.run_once(x, tol, &mut rng);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| LabError::Internal("k-means produced no fit".to_string()))
    }

    fn run_once(&self, x: &Array2<f64>, tol: f64, rng: &mut ChaCha8Rng) -> KMeansFit {
        let k = self.n_clusters;
        let mut centroids = kmeans_pp_init(x, k, rng);
        let mut labels = vec![0usize; x.nrows()];
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            assign(x, &centroids, &mut labels);

            let mut updated = Array2::<f64>::zeros(centroids.raw_dim());
            let mut counts = vec![0usize; k];
            for (i, &label) in labels.iter().enumerate() {
                let mut row = updated.row_mut(label);
                row += &x.row(i);
                counts[label] += 1;
            }

            for c in 0..k {
                if counts[c] > 0 {
                    updated.row_mut(c).mapv_inplace(|v| v / counts[c] as f64);
                } else {
                    // Empty cluster: move it to the point farthest from its centroid
                    let far = farthest_point(x, &centroids, &labels);
                    updated.row_mut(c).assign(&x.row(far));
                    labels[far] = c;
                }
            }

            let shift: f64 = (&updated - &centroids).mapv(|v| v * v).sum();
            centroids = updated;
            if shift <= tol {
                break;
            }
        }

        assign(x, &centroids, &mut labels);
        let inertia = labels
            .iter()
            .enumerate()
            .map(|(i, &c)| squared_distance(&x.row(i), &centroids.row(c)))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

impl KMeansFit {
    /// Nearest centroid for each row
    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        let mut labels = vec![0usize; x.nrows()];
        assign(x, &self.centroids, &mut labels);
        labels
    }

    /// Centroid of each sample's cluster, one row per sample
    pub fn assigned_centers(&self) -> Array2<f64> {
        self.centroids.select(Axis(0), &self.labels)
    }
}

fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(row: &ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    centroids
        .rows()
        .into_iter()
        .enumerate()
        .map(|(c, centroid)| (c, squared_distance(row, &centroid)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

fn assign(x: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) {
    for (i, row) in x.rows().into_iter().enumerate() {
        labels[i] = nearest(&row, centroids).0;
    }
}

fn farthest_point(x: &Array2<f64>, centroids: &Array2<f64>, labels: &[usize]) -> usize {
    labels
        .iter()
        .enumerate()
        .map(|(i, &c)| (i, squared_distance(&x.row(i), &centroids.row(c))))
        .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best })
        .0
}

/// k-means++: each new centroid is drawn with probability proportional to D²
fn kmeans_pp_init(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n_samples = x.nrows();
    let mut centroids = Array2::<f64>::zeros((k, x.ncols()));

    let first = rng.gen_range(0..n_samples);
    centroids.row_mut(0).assign(&x.row(first));

    let mut dists: Vec<f64> = x
        .rows()
        .into_iter()
        .map(|row| squared_distance(&row, &centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = dists.iter().sum();
        let chosen = if total <= 0.0 {
            rng.gen_range(0..n_samples)
        } else {
            let r = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = n_samples - 1;
            for (i, &d) in dists.iter().enumerate() {
                cumulative += d;
                if cumulative >= r {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        centroids.row_mut(c).assign(&x.row(chosen));

        for (i, row) in x.rows().into_iter().enumerate() {
            let d = squared_distance(&row, &centroids.row(c));
            if d < dists[i] {
                dists[i] = d;
            }
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn three_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [10.0, 10.0],
            [10.1, 9.9],
            [9.9, 10.2],
            [0.0, 10.0],
            [0.2, 10.1],
            [-0.1, 9.8]
        ]
    }

    #[test]
    fn test_separates_blobs() {
        let x = three_blobs();
        let fit = KMeans::new(3).with_seed(Some(42)).with_n_init(4).fit(&x).unwrap();

        assert_eq!(fit.labels.len(), 9);
        for blob in 0..3 {
            let first = fit.labels[blob * 3];
            assert!(fit.labels[blob * 3..blob * 3 + 3].iter().all(|&l| l == first));
        }
        let mut distinct = fit.labels.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);
        assert!(fit.inertia < 1.0);
    }

    #[test]
    fn test_single_cluster_is_the_mean() {
        let x = three_blobs();
        let fit = KMeans::new(1).with_seed(Some(1)).fit(&x).unwrap();

        let mean = x.mean_axis(Axis(0)).unwrap();
        assert_abs_diff_eq!(fit.centroids[[0, 0]], mean[0], epsilon = 1e-12);
        assert_abs_diff_eq!(fit.centroids[[0, 1]], mean[1], epsilon = 1e-12);
        assert!(fit.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_predict_and_assigned_centers() {
        let x = three_blobs();
        let fit = KMeans::new(3).with_seed(Some(7)).with_n_init(4).fit(&x).unwrap();

        assert_eq!(fit.predict(&x), fit.labels);
        let centers = fit.assigned_centers();
        assert_eq!(centers.dim(), (9, 2));
        assert_eq!(centers.row(4), fit.centroids.row(fit.labels[4]));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let x = three_blobs();
        let a = KMeans::new(2).with_seed(Some(5)).fit(&x).unwrap();
        let b = KMeans::new(2).with_seed(Some(5)).fit(&x).unwrap();
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_max_iter_caps_lloyd_steps() {
        let x = three_blobs();
        let fit = KMeans::new(3).with_seed(Some(3)).with_max_iter(1).fit(&x).unwrap();
        assert_eq!(fit.n_iter, 1);
        assert_eq!(fit.labels.len(), 9);
    }

    #[test]
    fn test_invalid_k() {
        let x = three_blobs();
        assert!(matches!(KMeans::new(0).fit(&x), Err(LabError::InvalidInput(_))));
        assert!(matches!(KMeans::new(10).fit(&x), Err(LabError::InvalidInput(_))));
    }
}
