// Metric multidimensional scaling via SMACOF
//
// Minimizes raw stress sum_{i<j} (d_ij(X) - delta_ij)^2 with Guttman
// transforms from several random starts, keeping the lowest-stress embedding.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LabError, Result};
use crate::sampling::seeded_rng;
use crate::stats::euclidean_distances;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mds {
    pub n_components: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative stress improvement below which iterations stop
    pub eps: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct MdsFit {
    /// n_samples x n_components
    pub embedding: Array2<f64>,
    pub stress: f64,
    pub n_iter: usize,
}

impl Default for Mds {
    fn default() -> Self {
        Mds {
            n_components: 2,
            n_init: 4,
            max_iter: 300,
            eps: 1e-3,
            seed: None,
        }
    }
}

impl Mds {
    pub fn new(n_components: usize) -> Self {
        Mds {
            n_components,
            ..Mds::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Embed the rows of `data` using Euclidean dissimilarities
    pub fn fit_euclidean(&self, data: &Array2<f64>) -> Result<MdsFit> {
        self.fit_precomputed(&euclidean_distances(data))
    }

    /// Embed items given a symmetric dissimilarity matrix
    pub fn fit_precomputed(&self, dissimilarities: &Array2<f64>) -> Result<MdsFit> {
        let n = dissimilarities.nrows();
        if n != dissimilarities.ncols() {
            return Err(LabError::InvalidInput(format!(
                "dissimilarity matrix must be square, got {}x{}",
                n,
                dissimilarities.ncols()
            )));
        }
        if n == 0 || self.n_components == 0 {
            return Err(LabError::InvalidInput(
                "MDS needs at least one item and one component".to_string(),
            ));
        }
        if dissimilarities.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(LabError::Numerical(
                "dissimilarities must be finite and non-negative".to_string(),
            ));
        }

        let mut rng = seeded_rng(self.seed);
        let mut best: Option<MdsFit> = None;

        for run in 0..self.n_init.max(1) {
            let start = Array2::from_shape_fn((n, self.n_components), |_| rng.gen::<f64>());
            let fit = self.smacof_single(dissimilarities, start);
            debug!(run, stress = fit.stress, n_iter = fit.n_iter, "smacof run finished");
            if best.as_ref().map_or(true, |b| fit.stress < b.stress) {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| LabError::Internal("MDS produced no embedding".to_string()))
    }

    fn smacof_single(&self, delta: &Array2<f64>, mut x: Array2<f64>) -> MdsFit {
        let n = delta.nrows();
        let mut old_stress: Option<f64> = None;
        let mut stress = raw_stress(delta, &euclidean_distances(&x));
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let dist = euclidean_distances(&x);
            stress = raw_stress(delta, &dist);

            // Guttman transform: X <- B(X) X / n
            let mut b = Array2::<f64>::zeros((n, n));
            for i in 0..n {
                let mut diag = 0.0;
                for j in 0..n {
                    if i != j && dist[[i, j]] > f64::EPSILON {
                        let v = -delta[[i, j]] / dist[[i, j]];
                        b[[i, j]] = v;
                        diag -= v;
                    }
                }
                b[[i, i]] = diag;
            }
            x = b.dot(&x) / n as f64;

            let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm <= f64::EPSILON {
                break;
            }
            let normalized = stress / norm;
            if let Some(previous) = old_stress {
                if previous - normalized < self.eps {
                    break;
                }
            }
            old_stress = Some(normalized);
        }

        MdsFit {
            embedding: x,
            stress,
            n_iter,
        }
    }
}

fn raw_stress(delta: &Array2<f64>, dist: &Array2<f64>) -> f64 {
    let n = delta.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            sum += (dist[[i, j]] - delta[[i, j]]).powi(2);
        }
    }
    sum
}
