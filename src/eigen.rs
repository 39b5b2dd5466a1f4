// Symmetric eigendecomposition (cyclic Jacobi rotations)

use ndarray::{Array1, Array2};

use crate::error::{LabError, Result};

const MAX_SWEEPS: usize = 100;
const TOLERANCE: f64 = 1e-12;

/// Eigenvalues sorted in descending order with matching eigenvector columns
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    pub eigenvalues: Array1<f64>,
    /// Columns are eigenvectors
    pub eigenvectors: Array2<f64>,
}

/// Decompose a symmetric matrix.
///
/// Each eigenvector is sign-normalized so its largest-magnitude entry is
/// positive, which makes the output deterministic.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> Result<EigenDecomposition> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(LabError::Numerical(format!(
            "eigendecomposition needs a square matrix, got {}x{}",
            n,
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(LabError::Numerical(
            "matrix contains non-finite values".to_string(),
        ));
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt().max(1.0);

    for _sweep in 0..MAX_SWEEPS {
        if off_diagonal_norm(&a) <= TOLERANCE * scale {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]].abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let (cos_theta, sin_theta) = compute_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
                apply_rotation(&mut a, &mut v, p, q, cos_theta, sin_theta);
            }
        }
    }

    // Sort descending
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| {
        a[[j, j]]
            .partial_cmp(&a[[i, i]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let eigenvalues: Array1<f64> = indices.iter().map(|&i| a[[i, i]]).collect();
    let mut eigenvectors = Array2::<f64>::zeros((n, n));
    for (new_idx, &old_idx) in indices.iter().enumerate() {
        let mut column = v.column(old_idx).to_owned();
        let pivot = column
            .iter()
            .copied()
            .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if pivot < 0.0 {
            column.mapv_inplace(|x| -x);
        }
        eigenvectors.column_mut(new_idx).assign(&column);
    }

    Ok(EigenDecomposition {
        eigenvalues,
        eigenvectors,
    })
}

fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
    let n = a.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += a[[i, j]] * a[[i, j]];
            }
        }
    }
    sum.sqrt()
}

/// (cos, sin) of the rotation that zeroes a[p][q]
fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };
    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    (cos_theta, t * cos_theta)
}

fn apply_rotation(
    a: &mut Array2<f64>,
    v: &mut Array2<f64>,
    p: usize,
    q: usize,
    cos_theta: f64,
    sin_theta: f64,
) {
    let n = a.nrows();
    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];

    a[[p, p]] = cos_theta * cos_theta * app - 2.0 * cos_theta * sin_theta * apq
        + sin_theta * sin_theta * aqq;
    a[[q, q]] = sin_theta * sin_theta * app
        + 2.0 * cos_theta * sin_theta * apq
        + cos_theta * cos_theta * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];
            a[[i, p]] = cos_theta * aip - sin_theta * aiq;
            a[[p, i]] = a[[i, p]];
            a[[i, q]] = sin_theta * aip + cos_theta * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }

    for i in 0..n {
        let vip = v[[i, p]];
        let viq = v[[i, q]];
        v[[i, p]] = cos_theta * vip - sin_theta * viq;
        v[[i, q]] = sin_theta * vip + cos_theta * viq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn reconstruct(decomp: &EigenDecomposition) -> Array2<f64> {
        let v = &decomp.eigenvectors;
        let lambda = Array2::from_diag(&decomp.eigenvalues);
        v.dot(&lambda).dot(&v.t())
    }

    #[test]
    fn test_diagonal() {
        let matrix = array![[2.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 1.0]];
        let decomp = symmetric_eigen(&matrix).unwrap();

        assert_abs_diff_eq!(decomp.eigenvalues[0], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvalues[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvalues[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvectors[[1, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_reconstruction() {
        let matrix = array![
            [4.0, 1.0, 2.0, 0.5],
            [1.0, 3.0, 0.0, 1.5],
            [2.0, 0.0, 5.0, 1.0],
            [0.5, 1.5, 1.0, 2.0]
        ];
        let decomp = symmetric_eigen(&matrix).unwrap();
        let back = reconstruct(&decomp);

        for i in 0..4 {
            for j in 0..4 {
                assert_abs_diff_eq!(back[[i, j]], matrix[[i, j]], epsilon = 1e-9);
            }
        }
        // orthonormal eigenvectors
        let gram = decomp.eigenvectors.t().dot(&decomp.eigenvectors);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-9);
            }
        }
        // descending
        for k in 1..4 {
            assert!(decomp.eigenvalues[k - 1] >= decomp.eigenvalues[k]);
        }
    }

    #[test]
    fn test_known_pair() {
        // [[2,1],[1,2]] has eigenvalues 3 and 1
        let matrix = array![[2.0, 1.0], [1.0, 2.0]];
        let decomp = symmetric_eigen(&matrix).unwrap();

        assert_abs_diff_eq!(decomp.eigenvalues[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvalues[1], 1.0, epsilon = 1e-12);

        let s = 0.5f64.sqrt();
        assert_abs_diff_eq!(decomp.eigenvectors[[0, 0]].abs(), s, epsilon = 1e-12);
        // sign normalization: largest entry positive
        let first = decomp.eigenvectors.column(0);
        assert!(first.iter().fold(0.0f64, |m, x| if x.abs() > m.abs() { *x } else { m }) > 0.0);
    }

    #[test]
    fn test_rejects_non_square() {
        let matrix = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            symmetric_eigen(&matrix),
            Err(LabError::Numerical(_))
        ));
    }
}
