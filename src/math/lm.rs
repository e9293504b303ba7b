//! Levenberg–Marquardt nonlinear least squares.
//!
//! We minimize `‖r(p)‖²` where `r(p) = f(p) - y`. Each iteration solves the damped
//! Gauss–Newton step
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! with Marquardt scaling `D = diag(‖J_j‖)` (column norms of the Jacobian). The
//! damped system is solved as the stacked least-squares problem
//! `[J; √λ D] δ = [-r; 0]` via SVD, which avoids forming `JᵀJ`.
//!
//! Damping is divided by 10 after an accepted step and multiplied by 10 after a
//! rejected one.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// Smallest damping factor kept after repeated successful steps.
const MIN_DAMPING: f64 = 1e-15;

/// Largest damping factor before the solver gives up on making progress.
const MAX_DAMPING: f64 = 1e16;

/// A residual model for the solver.
pub trait LeastSquaresProblem {
    fn param_len(&self) -> usize;

    /// `f(p) - y` at the observation points.
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// `∂r_i / ∂p_j`.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub initial_damping: f64,
}

#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    /// Final `‖r‖²`.
    pub cost: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LmFailure {
    IterationLimit { iterations: usize, cost: f64 },
    /// A Jacobian column is identically zero, or the step could not be solved.
    Singular,
    NonFinite,
    /// Damping grew without bound without reducing the cost.
    Stalled { iterations: usize },
}

impl std::fmt::Display for LmFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LmFailure::IterationLimit { iterations, cost } => {
                write!(f, "iteration limit ({iterations}) exceeded, cost={cost:.6e}")
            }
            LmFailure::Singular => write!(f, "singular Jacobian"),
            LmFailure::NonFinite => write!(f, "non-finite residuals"),
            LmFailure::Stalled { iterations } => {
                write!(f, "no cost reduction possible after {iterations} iterations")
            }
        }
    }
}

/// Run Levenberg–Marquardt from `initial`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    initial: DVector<f64>,
    opts: &LmOptions,
) -> Result<LmReport, LmFailure> {
    let p = problem.param_len();
    let mut params = initial;
    let mut r = problem.residuals(&params);
    let mut cost = r.norm_squared();
    if !cost.is_finite() {
        return Err(LmFailure::NonFinite);
    }

    let mut lambda = opts.initial_damping;

    for iter in 1..=opts.max_iterations {
        let j = problem.jacobian(&params);
        let n = j.nrows();

        let scale: Vec<f64> = (0..p).map(|c| j.column(c).norm()).collect();
        if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(LmFailure::Singular);
        }

        let mut a = DMatrix::<f64>::zeros(n + p, p);
        a.view_mut((0, 0), (n, p)).copy_from(&j);
        let sqrt_lambda = lambda.sqrt();
        for c in 0..p {
            a[(n + c, c)] = sqrt_lambda * scale[c];
        }
        let mut b = DVector::<f64>::zeros(n + p);
        b.rows_mut(0, n).copy_from(&(-&r));

        let delta = solve_least_squares(&a, &b).ok_or(LmFailure::Singular)?;
        let step_small = delta.norm() <= opts.xtol * (params.norm() + opts.xtol);

        let candidate = &params + &delta;
        let r_new = problem.residuals(&candidate);
        let cost_new = r_new.norm_squared();

        if cost_new.is_finite() && cost_new <= cost {
            let reduction = cost - cost_new;
            let previous = cost;
            params = candidate;
            r = r_new;
            cost = cost_new;
            lambda = (lambda / 10.0).max(MIN_DAMPING);

            if reduction <= opts.ftol * previous || step_small {
                return Ok(LmReport {
                    params,
                    cost,
                    iterations: iter,
                });
            }
        } else {
            if step_small {
                return Ok(LmReport {
                    params,
                    cost,
                    iterations: iter,
                });
            }
            lambda *= 10.0;
            if lambda > MAX_DAMPING {
                return Err(LmFailure::Stalled { iterations: iter });
            }
        }
    }

    Err(LmFailure::IterationLimit {
        iterations: opts.max_iterations,
        cost,
    })
}
