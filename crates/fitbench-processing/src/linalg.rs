//! Small dense linear algebra helpers.
//!
//! Least squares is solved through the normal equations with a Cholesky
//! factorisation, falling back to Gauss-Jordan inversion when the system is
//! not positive definite even after a small ridge.

use ndarray::{Array1, Array2};

/// Solve the symmetric positive-definite system `a x = b`.
///
/// A ridge proportional to the mean diagonal is added once when the matrix
/// is not positive definite.
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = match cholesky_factor(a) {
        Some(l) => l,
        None => {
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
            let mut regularized = a.clone();
            for k in 0..n {
                regularized[[k, k]] += ridge;
            }
            cholesky_factor(&regularized)?
        }
    };

    // L y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Lower triangular `L` with `a = L L^T`, `None` when not positive definite.
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Invert a square matrix with partially pivoted Gauss-Jordan elimination.
pub fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}

/// Least squares weights of `x w = y` via the normal equations.
pub fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);

    if let Some(result) = cholesky_solve(&xtx, &xty) {
        return Some(result);
    }

    matrix_inverse(&xtx).map(|inv| inv.dot(&xty))
}

/// `x` with a leading column of ones.
pub fn with_intercept_column(x: &Array2<f64>) -> Array2<f64> {
    let mut result = Array2::ones((x.nrows(), x.ncols() + 1));
    result.slice_mut(ndarray::s![.., 1..]).assign(x);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        let check = a.dot(&x);
        assert!((check[0] - 2.0).abs() < 1e-10);
        assert!((check[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cholesky_solve_dimension_mismatch() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];
        let b = array![1.0, 2.0, 3.0];
        assert!(cholesky_solve(&a, &b).is_none());
    }

    #[test]
    fn test_matrix_inverse() {
        let m = array![[0.0, 1.0], [2.0, 0.0]];
        let inv = matrix_inverse(&m).unwrap();
        let identity = m.dot(&inv);
        assert!((identity[[0, 0]] - 1.0).abs() < 1e-10);
        assert!(identity[[0, 1]].abs() < 1e-10);
        assert!((identity[[1, 1]] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_matrix_inverse_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matrix_inverse(&m).is_none());
    }

    #[test]
    fn test_solve_least_squares_exact_line() {
        // y = 1 + 2x
        let x = with_intercept_column(&array![[0.0], [1.0], [2.0], [3.0]]);
        let y = array![1.0, 3.0, 5.0, 7.0];
        let w = solve_least_squares(&x, &y).unwrap();
        assert!((w[0] - 1.0).abs() < 1e-8);
        assert!((w[1] - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_with_intercept_column() {
        let x = with_intercept_column(&array![[5.0, 6.0]]);
        assert_eq!(x, array![[1.0, 5.0, 6.0]]);
    }
}
