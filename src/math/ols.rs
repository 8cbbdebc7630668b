//! Least squares solver.
//!
//! The only regression in this crate is a straight line through a short,
//! evenly spaced window (the reserve trend of the lending index), but the
//! solver is general:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD rather than normal equations, so a degenerate design (a single
//!   repeated x) is reported as `None` instead of producing garbage.
//! - Nalgebra's `QR::solve` is intended for square systems and panics for tall
//!   matrices, which is why SVD is used here.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Slope of the OLS line through `(i, values[i])` for `i = 0..n`.
///
/// `None` for fewer than two points.
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { r as f64 });
    let y = DVector::from_column_slice(values);
    let beta = solve_least_squares(&x, &y)?;
    Some(beta[1])
}
