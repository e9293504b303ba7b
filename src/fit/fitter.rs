//! Pre-failure polynomial fit of a single specimen.
//!
//! Given a built specimen we:
//! - restrict the curve to samples `0..=argmax(stress)` (the pre-failure region)
//! - fit `stress(x) = Σ_{k=1..8} a_k x^k` by Levenberg–Marquardt
//! - compute residual error metrics over the same region
//!
//! Numerical notes:
//! - Strain is normalized by the largest `|x|` in the domain before fitting so the
//!   monomial columns stay in `[-1, 1]`; coefficients are rescaled afterwards as
//!   `a_k = b_k / scale^k`.
//! - The solver starts from all-zero coefficients.

use nalgebra::{DMatrix, DVector};

use crate::domain::{CurveFitResult, FitSettings, POLYNOMIAL_ORDER, Specimen};
use crate::error::PipelineError;
use crate::math::{LeastSquaresProblem, LmOptions, first_argmax, levenberg_marquardt};
use crate::models::{fill_design_row, predict};

/// The pre-failure prefix of a specimen curve.
#[derive(Debug, Clone, PartialEq)]
pub struct PreFailureRegion<'a> {
    pub strain: &'a [f64],
    pub stress: &'a [f64],
}

/// Restrict a specimen to samples up to and including its maximum stress.
pub fn pre_failure_region(specimen: &Specimen) -> Result<PreFailureRegion<'_>, PipelineError> {
    specimen.check_aligned()?;
    let idx = first_argmax(&specimen.stress).ok_or_else(|| PipelineError::DegenerateCurve {
        id: specimen.id().to_string(),
        message: "stress curve is empty or contains NaN".to_string(),
    })?;
    Ok(PreFailureRegion {
        strain: &specimen.strain[..=idx],
        stress: &specimen.stress[..=idx],
    })
}

/// Residuals of the scaled polynomial; the Jacobian is the constant design matrix.
struct PolynomialProblem {
    design: DMatrix<f64>,
    observed: DVector<f64>,
}

impl PolynomialProblem {
    fn new(scaled_strain: &[f64], stress: &[f64]) -> Self {
        let n = scaled_strain.len();
        let mut design = DMatrix::<f64>::zeros(n, POLYNOMIAL_ORDER);
        let mut row = [0.0; POLYNOMIAL_ORDER];
        for (i, &u) in scaled_strain.iter().enumerate() {
            fill_design_row(u, &mut row);
            for (j, &v) in row.iter().enumerate() {
                design[(i, j)] = v;
            }
        }
        Self {
            design,
            observed: DVector::from_column_slice(stress),
        }
    }
}

impl LeastSquaresProblem for PolynomialProblem {
    fn param_len(&self) -> usize {
        POLYNOMIAL_ORDER
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        &self.design * params - &self.observed
    }

    fn jacobian(&self, _params: &DVector<f64>) -> DMatrix<f64> {
        self.design.clone()
    }
}

/// Fit the pre-failure region of a specimen.
pub fn fit_specimen(specimen: &Specimen, settings: &FitSettings) -> Result<CurveFitResult, PipelineError> {
    let id = specimen.id();
    let region = pre_failure_region(specimen)?;
    let n = region.strain.len();

    if n < POLYNOMIAL_ORDER {
        return Err(PipelineError::InsufficientSamples {
            context: format!("curve fit of specimen '{id}'"),
            needed: POLYNOMIAL_ORDER,
            got: n,
        });
    }

    let no_convergence = |message: String| PipelineError::FitDidNotConverge {
        id: id.to_string(),
        message,
    };

    let scale = region.strain.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if !(scale.is_finite() && scale > 0.0) {
        return Err(no_convergence("all pre-failure strains are zero (singular system)".to_string()));
    }
    let scaled: Vec<f64> = region.strain.iter().map(|x| x / scale).collect();

    let problem = PolynomialProblem::new(&scaled, region.stress);
    let opts = LmOptions {
        max_iterations: settings.max_iterations,
        ftol: settings.ftol,
        xtol: settings.xtol,
        initial_damping: settings.initial_damping,
    };
    let report = levenberg_marquardt(&problem, DVector::zeros(POLYNOMIAL_ORDER), &opts)
        .map_err(|e| no_convergence(e.to_string()))?;

    let mut coefficients = [0.0; POLYNOMIAL_ORDER];
    let mut factor = 1.0;
    for (k, slot) in coefficients.iter_mut().enumerate() {
        factor *= scale;
        *slot = report.params[k] / factor;
    }
    if coefficients.iter().any(|a| !a.is_finite()) {
        return Err(no_convergence("non-finite coefficients after rescaling".to_string()));
    }

    let metrics = error_metrics(id, region.strain, region.stress, &coefficients)?;
    log::debug!(
        "Fitted specimen '{id}': n={n} iterations={} cost={:.6e}",
        report.iterations,
        report.cost
    );

    Ok(CurveFitResult {
        coefficients,
        domain: (0.0, *region.strain.last().unwrap_or(&0.0)),
        rms_error: metrics.mean_abs,
        max_absolute_error: metrics.max_abs,
        max_relative_error: metrics.max_relative,
        sample_count: n,
        iterations: report.iterations,
    })
}

/// Residual error metrics over a fit domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMetrics {
    /// `mean(|obs - pred|)`.
    pub mean_abs: f64,
    /// `max(|obs - pred|)`.
    pub max_abs: f64,
    /// `max(|obs - pred| / obs)` over samples with non-zero observed stress.
    pub max_relative: f64,
}

/// Compute error metrics of `coefficients` against observed samples.
pub fn error_metrics(
    id: &str,
    strain: &[f64],
    stress: &[f64],
    coefficients: &[f64],
) -> Result<ErrorMetrics, PipelineError> {
    let abs_errors: Vec<f64> = strain
        .iter()
        .zip(stress)
        .map(|(&x, &y)| (y - predict(x, coefficients)).abs())
        .collect();

    if abs_errors.is_empty() {
        return Err(PipelineError::InsufficientSamples {
            context: format!("error metrics of specimen '{id}'"),
            needed: 1,
            got: 0,
        });
    }

    let mean_abs = abs_errors.iter().sum::<f64>() / abs_errors.len() as f64;
    let max_abs = abs_errors.iter().copied().fold(0.0, f64::max);

    // Samples with zero observed stress (the origin sample) are excluded.
    let max_relative = abs_errors
        .iter()
        .zip(stress)
        .filter(|(_, y)| **y != 0.0)
        .map(|(e, y)| e / y)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .ok_or_else(|| PipelineError::DivisionByZero {
            id: id.to_string(),
            message: "every observed stress in the fit domain is zero".to_string(),
        })?;

    Ok(ErrorMetrics {
        mean_abs,
        max_abs,
        max_relative,
    })
}

/// Sample the fitted polynomial on `[domain.0, domain.1]` with the given strain step.
///
/// The upper bound is always included as the final point.
pub fn interpolation_grid(result: &CurveFitResult, step: f64) -> (Vec<f64>, Vec<f64>) {
    let (lo, hi) = result.domain;
    let mut strain = Vec::new();
    if step.is_finite() && step > 0.0 && hi > lo {
        let steps = ((hi - lo) / step).floor() as usize;
        for i in 0..=steps {
            let x = lo + i as f64 * step;
            if x < hi - step * 1e-9 {
                strain.push(x);
            }
        }
    }
    strain.push(hi);

    let stress = strain.iter().map(|&x| predict(x, &result.coefficients)).collect();
    (strain, stress)
}
