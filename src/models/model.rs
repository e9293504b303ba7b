//! Model evaluation for the origin-pinned polynomial
//! `stress(x) = a1 x + a2 x² + … + a8 x⁸`.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given strain (the model is linear in `a_k`, so the
//!   design row is also the Jacobian row)
//! - predict stress given coefficients (for residuals, exports and plots)

/// Fill a design row `[x, x², …, x^n]` for `n = out.len()`.
///
/// There is no constant column: the model is zero at `x = 0`.
pub fn fill_design_row(x: f64, out: &mut [f64]) {
    let mut power = 1.0;
    for slot in out.iter_mut() {
        power *= x;
        *slot = power;
    }
}

/// Predict `stress(x)` for coefficients `a1..an` (Horner form).
pub fn predict(x: f64, coefficients: &[f64]) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &a| (acc + a) * x)
}
