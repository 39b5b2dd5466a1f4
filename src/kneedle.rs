// Kneedle: pick the "knee"/"elbow" of a curve
//
// Offline variant of Satopaa et al. (2011), returning the first knee found.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Convex,
    Concave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone)]
pub struct KneeLocator {
    pub curve: Curve,
    pub direction: Direction,
    /// Sensitivity: higher values wait for a bigger drop before accepting a knee
    pub sensitivity: f64,
}

impl KneeLocator {
    pub fn new(curve: Curve, direction: Direction) -> Self {
        KneeLocator {
            curve,
            direction,
            sensitivity: 1.0,
        }
    }

    /// Elbow of a decreasing error curve (eigenvalues, k-means error)
    pub fn elbow() -> Self {
        Self::new(Curve::Convex, Direction::Decreasing)
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Index into `x` of the knee, or None when the curve has none
    pub fn find_index(&self, x: &[f64], y: &[f64]) -> Option<usize> {
        let n = x.len();
        if n < 3 || n != y.len() {
            return None;
        }

        let x_norm = normalize(x)?;
        let y_norm = self.transform_y(&normalize(y)?);

        let y_diff: Vec<f64> = y_norm.iter().zip(&x_norm).map(|(yn, xn)| yn - xn).collect();

        let maxima = relative_extrema(&y_diff, |a, b| a >= b);
        let minima = relative_extrema(&y_diff, |a, b| a <= b);
        let first_max = *maxima.first()?;

        let mean_step = x_norm.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>()
            / (n - 1) as f64;
        let thresholds: Vec<f64> = maxima
            .iter()
            .map(|&i| y_diff[i] - self.sensitivity * mean_step)
            .collect();

        let mut maxima_seen = 0;
        let mut threshold = 0.0;
        let mut threshold_index = first_max;

        for i in first_max..n - 1 {
            if maxima.binary_search(&i).is_ok() {
                threshold = thresholds[maxima_seen];
                threshold_index = i;
                maxima_seen += 1;
            }
            if minima.binary_search(&i).is_ok() {
                threshold = 0.0;
            }

            if y_diff[i + 1] < threshold {
                let index = match (self.curve, self.direction) {
                    (Curve::Convex, Direction::Decreasing) | (Curve::Concave, Direction::Increasing) => {
                        threshold_index
                    }
                    (Curve::Convex, Direction::Increasing) | (Curve::Concave, Direction::Decreasing) => {
                        n - 1 - threshold_index
                    }
                };
                return Some(index);
            }
        }

        None
    }

    /// x value of the knee
    pub fn find(&self, x: &[f64], y: &[f64]) -> Option<f64> {
        self.find_index(x, y).map(|i| x[i])
    }

    /// Map every curve shape onto a concave increasing one
    fn transform_y(&self, y: &[f64]) -> Vec<f64> {
        let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        match (self.curve, self.direction) {
            (Curve::Concave, Direction::Increasing) => y.to_vec(),
            (Curve::Convex, Direction::Decreasing) => y.iter().map(|v| max - v).collect(),
            (Curve::Concave, Direction::Decreasing) => y.iter().rev().copied().collect(),
            (Curve::Convex, Direction::Increasing) => y.iter().rev().map(|v| max - v).collect(),
        }
    }
}

fn normalize(values: &[f64]) -> Option<Vec<f64>> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - min) / range).collect())
}

/// Indices where `cmp(v[i], neighbour)` holds on both sides; edges compare with themselves
fn relative_extrema(values: &[f64], cmp: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let n = values.len();
    (0..n)
        .filter(|&i| {
            let left = values[i.saturating_sub(1)];
            let right = values[(i + 1).min(n - 1)];
            cmp(values[i], left) && cmp(values[i], right)
        })
        .collect()
}
