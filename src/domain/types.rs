//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during import, property extraction and fitting
//! - exported to JSON/CSV
//! - reloaded later by plotting or comparison tools

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::AnalysisSettings;
use crate::error::PipelineError;

/// Number of coefficients of the fitted polynomial (`a1..a8`, no constant term).
pub const POLYNOMIAL_ORDER: usize = 8;

/// One row of the batch configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecimenConfig {
    pub id: String,
    /// Cross-section width (mm).
    pub width: f64,
    /// Cross-section thickness (mm).
    pub thickness: f64,
    /// Gauge length (mm).
    pub length: f64,
    /// Zero-force correction, same unit as the measured force (N).
    pub force_offset: f64,
    /// Operator-asserted validity of the measurement.
    pub is_valid: bool,
    /// Display hint, ignored by the numeric core.
    pub color: Option<String>,
    /// Raw measurement file, resolved against the configuration file's directory.
    pub source_file: PathBuf,
    /// 1-based line in the configuration file.
    pub line: usize,
}

impl SpecimenConfig {
    /// Cross-sectional area (mm²).
    pub fn area(&self) -> f64 {
        self.width * self.thickness
    }
}

/// A specimen with its engineering stress-strain curve.
///
/// Invariant: `strain.len() == stress.len() >= 1`, all values finite, and index
/// `i` in both sequences refers to the same measurement sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specimen {
    pub config: SpecimenConfig,
    /// Strain in percent.
    pub strain: Vec<f64>,
    /// Stress in MPa (N/mm²).
    pub stress: Vec<f64>,
}

impl Specimen {
    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn len(&self) -> usize {
        self.strain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strain.is_empty()
    }

    /// Check that strain and stress are non-empty and index-aligned.
    pub fn check_aligned(&self) -> Result<(), PipelineError> {
        if self.strain.len() != self.stress.len() || self.strain.is_empty() {
            return Err(PipelineError::DegenerateCurve {
                id: self.config.id.clone(),
                message: format!(
                    "strain and stress must be non-empty and of equal length (got {} and {})",
                    self.strain.len(),
                    self.stress.len()
                ),
            });
        }
        Ok(())
    }
}

/// Per-specimen derived scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedProperties {
    pub max_stress: f64,
    pub strain_at_max_stress: f64,
    /// Secant modulus (MPa).
    pub youngs_modulus: f64,
    /// Index of the first sample attaining `max_stress` (the failure point).
    pub max_index: usize,
    pub sample_count: usize,
}

/// A built specimen together with its derived properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecimenResult {
    pub specimen: Specimen,
    pub properties: DerivedProperties,
}

/// Summary statistics of one derived property across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyStats {
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (`N - 1` denominator).
    pub std_dev: f64,
    /// Population standard deviation (`N` denominator).
    pub population_std_dev: f64,
    pub count: usize,
}

/// Cross-specimen statistics over the derived properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub max_stress: PropertyStats,
    pub strain_at_max_stress: PropertyStats,
    pub youngs_modulus: PropertyStats,
    /// Strain at maximum stress of the specimen holding the overall maximum stress.
    pub strain_of_max_max_stress: f64,
}

impl BatchStatistics {
    /// Property name → statistics, in a fixed order.
    pub fn entries(&self) -> [(&'static str, &PropertyStats); 3] {
        [
            ("max_stress", &self.max_stress),
            ("strain_at_max_stress", &self.strain_at_max_stress),
            ("youngs_modulus", &self.youngs_modulus),
        ]
    }
}

/// Closed-form `stress(strain)` model of one specimen's pre-failure region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveFitResult {
    /// `a1..a8` of `Σ a_k x^k`.
    pub coefficients: [f64; POLYNOMIAL_ORDER],
    /// Valid strain range `[0, strain_at_max_stress]` (percent).
    pub domain: (f64, f64),
    /// Mean absolute residual (kept under its historical name).
    pub rms_error: f64,
    pub max_absolute_error: f64,
    /// Maximum of `|residual| / observed` as a fraction.
    pub max_relative_error: f64,
    pub sample_count: usize,
    pub iterations: usize,
}

/// A failed specimen recorded under `FailurePolicy::Skip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecimenFailure {
    pub id: String,
    pub line: usize,
    pub message: String,
}

/// What to do when a single specimen cannot be imported or analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole batch on the first bad specimen.
    #[default]
    Abort,
    /// Skip the specimen and log a warning.
    Skip,
}

/// How a specimen is picked for curve fitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecimenSelector {
    /// Position in the (filtered) batch.
    Index(usize),
    /// Specimen id from the configuration file.
    Id(String),
}

impl SpecimenSelector {
    /// Parse a CLI value: numbers are batch positions, anything else is an id.
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<usize>() {
            Ok(idx) => SpecimenSelector::Index(idx),
            Err(_) => SpecimenSelector::Id(value.trim().to_string()),
        }
    }
}

impl Default for SpecimenSelector {
    fn default() -> Self {
        SpecimenSelector::Index(0)
    }
}

/// Which pipeline variant to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Import, properties and statistics.
    Batch,
    /// Batch analysis plus a curve fit of one selected specimen.
    BatchWithFit(SpecimenSelector),
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags plus the optional settings file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub config_path: PathBuf,
    pub valid_only: bool,
    pub failure_policy: FailurePolicy,
    pub mode: AnalysisMode,
    pub settings: AnalysisSettings,

    pub export_data: Option<PathBuf>,
    pub export_report: Option<PathBuf>,
    pub export_grid: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_index_or_id() {
        assert_eq!(SpecimenSelector::parse("3"), SpecimenSelector::Index(3));
        assert_eq!(
            SpecimenSelector::parse(" P-12 "),
            SpecimenSelector::Id("P-12".to_string())
        );
    }

    fn specimen(strain: Vec<f64>, stress: Vec<f64>) -> Specimen {
        Specimen {
            config: SpecimenConfig {
                id: "M".to_string(),
                width: 1.0,
                thickness: 1.0,
                length: 1.0,
                force_offset: 0.0,
                is_valid: true,
                color: None,
                source_file: PathBuf::from("m.txt"),
                line: 3,
            },
            strain,
            stress,
        }
    }

    #[test]
    fn mismatched_or_empty_curves_are_degenerate() {
        assert!(specimen(vec![0.0, 1.0], vec![0.0, 2.0]).check_aligned().is_ok());
        for s in [specimen(vec![0.0, 1.0], vec![0.0]), specimen(vec![], vec![])] {
            assert!(matches!(
                s.check_aligned().unwrap_err(),
                PipelineError::DegenerateCurve { .. }
            ));
        }
    }

    #[test]
    fn failure_policy_defaults_to_abort() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }
}
