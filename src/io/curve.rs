//! Read/write curve-fit reports.
//!
//! The report JSON is the portable representation of a fitted specimen:
//! - polynomial coefficients and valid strain domain
//! - the three residual error metrics
//! - a precomputed interpolation grid for quick plotting
//!
//! The interpolation grid can also be written on its own as a spreadsheet CSV.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::domain::{CurveFitResult, POLYNOMIAL_ORDER, Specimen};
use crate::error::PipelineError;
use crate::fit::interpolation_grid;
use crate::io::export::format_decimal;

/// A saved curve-fit report (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReportFile {
    pub tool: String,
    pub generated_at: DateTime<Local>,
    pub specimen_id: String,
    pub source_file: PathBuf,
    pub coefficients: [f64; POLYNOMIAL_ORDER],
    pub domain: (f64, f64),
    pub rms_error: f64,
    pub max_absolute_error: f64,
    pub max_relative_error: f64,
    pub sample_count: usize,
    pub iterations: usize,
    pub grid: InterpolationGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationGrid {
    pub step: f64,
    pub strain: Vec<f64>,
    pub stress: Vec<f64>,
}

impl FitReportFile {
    pub fn new(specimen: &Specimen, fit: &CurveFitResult, step: f64) -> Self {
        let (strain, stress) = interpolation_grid(fit, step);
        Self {
            tool: "tensile".to_string(),
            generated_at: Local::now(),
            specimen_id: specimen.id().to_string(),
            source_file: specimen.config.source_file.clone(),
            coefficients: fit.coefficients,
            domain: fit.domain,
            rms_error: fit.rms_error,
            max_absolute_error: fit.max_absolute_error,
            max_relative_error: fit.max_relative_error,
            sample_count: fit.sample_count,
            iterations: fit.iterations,
            grid: InterpolationGrid { step, strain, stress },
        }
    }

    /// The fit result this report was written from.
    pub fn to_fit_result(&self) -> CurveFitResult {
        CurveFitResult {
            coefficients: self.coefficients,
            domain: self.domain,
            rms_error: self.rms_error,
            max_absolute_error: self.max_absolute_error,
            max_relative_error: self.max_relative_error,
            sample_count: self.sample_count,
            iterations: self.iterations,
        }
    }
}

/// Write a curve-fit report JSON file.
pub fn write_fit_report_json(path: &Path, report: &FitReportFile) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::to_writer_pretty(file, report).map_err(|e| PipelineError::Export {
        path: path.to_path_buf(),
        message: format!("Failed to write report JSON: {e}"),
    })?;

    log::info!("Wrote curve-fit report to '{}'", path.display());
    Ok(())
}

/// Read a curve-fit report JSON file.
pub fn read_fit_report_json(path: &Path) -> Result<FitReportFile, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(file).map_err(|e| PipelineError::Export {
        path: path.to_path_buf(),
        message: format!("Invalid report JSON: {e}"),
    })
}

/// Write the interpolation grid as `Strain;Stress` rows with decimal commas.
pub fn write_interpolation_csv(path: &Path, grid: &InterpolationGrid) -> Result<(), PipelineError> {
    let io_err = |source: std::io::Error| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(io_err)?;

    writeln!(file, "Strain;Stress").map_err(io_err)?;
    for (x, y) in grid.strain.iter().zip(&grid.stress) {
        writeln!(file, "{};{}", format_decimal(*x), format_decimal(*y)).map_err(io_err)?;
    }

    log::info!(
        "Wrote {} interpolation points to '{}'",
        grid.strain.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpecimenConfig;

    fn fixture() -> (Specimen, CurveFitResult) {
        let specimen = Specimen {
            config: SpecimenConfig {
                id: "7".to_string(),
                width: 10.0,
                thickness: 2.0,
                length: 50.0,
                force_offset: 0.0,
                is_valid: true,
                color: None,
                source_file: PathBuf::from("7.txt"),
                line: 9,
            },
            strain: vec![0.0, 0.02],
            stress: vec![0.0, 1.0],
        };
        let fit = CurveFitResult {
            coefficients: [50.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            domain: (0.0, 0.02),
            rms_error: 0.01,
            max_absolute_error: 0.02,
            max_relative_error: 0.05,
            sample_count: 8,
            iterations: 4,
        };
        (specimen, fit)
    }

    #[test]
    fn report_json_round_trip() {
        let (specimen, fit) = fixture();
        let report = FitReportFile::new(&specimen, &fit, 0.01);
        assert_eq!(report.grid.strain, vec![0.0, 0.01, 0.02]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_fit_report_json(&path, &report).unwrap();
        let back = read_fit_report_json(&path).unwrap();

        assert_eq!(back.specimen_id, "7");
        assert_eq!(back.to_fit_result(), fit);
        assert_eq!(back.grid, report.grid);
    }

    #[test]
    fn interpolation_csv_uses_decimal_comma() {
        let (specimen, fit) = fixture();
        let report = FitReportFile::new(&specimen, &fit, 0.01);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Interpolation.csv");
        write_interpolation_csv(&path, &report.grid).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Strain;Stress");
        assert_eq!(lines[1], "0;0");
        assert_eq!(lines[2], "0,01;0,5");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn invalid_report_json_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_fit_report_json(&path).unwrap_err(),
            PipelineError::Export { .. }
        ));
    }
}
