// Descriptive statistics over samples x features matrices

use ndarray::{Array1, Array2, Axis};

/// Per-feature means
pub fn column_means(data: &Array2<f64>) -> Array1<f64> {
    data.mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(data.ncols()))
}

/// Per-feature population standard deviations (ddof = 0)
pub fn column_stds(data: &Array2<f64>) -> Array1<f64> {
    if data.nrows() == 0 {
        return Array1::zeros(data.ncols());
    }
    data.std_axis(Axis(0), 0.0)
}

/// Subtract the per-feature mean
pub fn center(data: &Array2<f64>) -> Array2<f64> {
    data - &column_means(data)
}

/// Z-score every feature with the population standard deviation.
///
/// Constant features are only centered (their scale is treated as 1).
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let stds = column_stds(data).mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
    center(data) / &stds
}

/// Sample covariance (ddof = 1) of an already centered matrix
pub fn covariance_of_centered(centered: &Array2<f64>) -> Array2<f64> {
    let denom = (centered.nrows().max(2) - 1) as f64;
    centered.t().dot(centered) / denom
}

/// Pairwise Pearson correlation between features.
///
/// A pair involving a constant feature has no defined correlation and gets 0
/// off the diagonal; the diagonal is always 1.
pub fn pearson_matrix(data: &Array2<f64>) -> Array2<f64> {
    let d = data.ncols();
    let centered = center(data);
    let norms: Vec<f64> = centered
        .columns()
        .into_iter()
        .map(|c| c.dot(&c).sqrt())
        .collect();

    let mut corr = Array2::<f64>::eye(d);
    for i in 0..d {
        for j in (i + 1)..d {
            let denom = norms[i] * norms[j];
            let r = if denom > f64::EPSILON {
                (centered.column(i).dot(&centered.column(j)) / denom).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }
    corr
}

/// Pairwise Euclidean distances between rows
pub fn euclidean_distances(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let mut dist = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(data.row(i).iter().copied(), data.row(j).iter().copied());
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    dist
}

pub fn euclidean(a: impl IntoIterator<Item = f64>, b: impl IntoIterator<Item = f64>) -> f64 {
    a.into_iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Mean of squared elementwise differences, averaged over every output
pub fn mean_squared_error(actual: &Array2<f64>, predicted: &Array2<f64>) -> f64 {
    let len = actual.len();
    if len == 0 {
        return 0.0;
    }
    let sse: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    sse / len as f64
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
