//! Linear least squares solver.
//!
//! The Levenberg–Marquardt step solves a small, tall linear system
//!
//! ```text
//! minimize ‖A δ - b‖²
//! ```
//!
//! where `A` is the Jacobian stacked on top of the damping rows. We use SVD so the
//! solve stays robust when polynomial columns are nearly collinear.
//! (Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
