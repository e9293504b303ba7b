//! Analysis settings (TOML).
//!
//! Every numeric constant that affects import, property extraction or fitting is
//! a named setting with the historical value as its default. A settings file only
//! needs the keys it wants to change:
//!
//! ```toml
//! [properties]
//! reference_strain_low = 0.05
//! reference_strain_high = 0.25
//!
//! [fit]
//! export_step = 0.01
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Root of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    pub import: ImportSettings,
    pub properties: PropertySettings,
    pub fit: FitSettings,
}

/// Layout of the batch configuration and raw measurement files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportSettings {
    /// Header lines skipped at the top of the batch configuration file.
    pub config_header_lines: usize,
    /// Header lines skipped at the top of each raw measurement file.
    pub raw_header_lines: usize,
    /// Field delimiter of the batch configuration file (single byte).
    pub delimiter: char,
    /// Case-insensitive substrings of the validity cell marking a measurement as invalid.
    pub invalid_markers: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            config_header_lines: 2,
            raw_header_lines: 3,
            delimiter: ';',
            invalid_markers: vec!["nein".to_string()],
        }
    }
}

/// Secant modulus reference points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertySettings {
    /// Lower reference strain (percent).
    pub reference_strain_low: f64,
    /// Upper reference strain (percent).
    pub reference_strain_high: f64,
    /// Factor applied to the secant slope; `100` converts MPa per percent to MPa.
    pub modulus_scale: f64,
}

impl Default for PropertySettings {
    fn default() -> Self {
        Self {
            reference_strain_low: 0.05,
            reference_strain_high: 0.25,
            modulus_scale: 100.0,
        }
    }
}

/// Levenberg–Marquardt and interpolation export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitSettings {
    pub max_iterations: usize,
    /// Relative cost reduction below which the solver stops.
    pub ftol: f64,
    /// Relative step size below which the solver stops.
    pub xtol: f64,
    /// Starting Marquardt damping factor.
    pub initial_damping: f64,
    /// Strain step (percent) of the exported interpolation grid.
    pub export_step: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-12,
            initial_damping: 1e-3,
            export_step: 0.01,
        }
    }
}

impl AnalysisSettings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|message| PipelineError::Settings {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse and validate settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self, String> {
        let settings: AnalysisSettings =
            toml::from_str(content).map_err(|e| format!("Failed to parse TOML: {e}"))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.import.delimiter.is_ascii() {
            return Err("`import.delimiter` must be a single ASCII character.".to_string());
        }
        let p = &self.properties;
        if !(p.reference_strain_low.is_finite() && p.reference_strain_high.is_finite()) {
            return Err("Reference strains must be finite.".to_string());
        }
        if p.reference_strain_low == p.reference_strain_high {
            return Err("Reference strains must differ.".to_string());
        }
        if !(p.modulus_scale.is_finite() && p.modulus_scale != 0.0) {
            return Err("`properties.modulus_scale` must be finite and non-zero.".to_string());
        }
        let f = &self.fit;
        if f.max_iterations == 0 {
            return Err("`fit.max_iterations` must be > 0.".to_string());
        }
        if !(f.ftol.is_finite() && f.ftol >= 0.0 && f.xtol.is_finite() && f.xtol >= 0.0) {
            return Err("`fit.ftol` and `fit.xtol` must be finite and >= 0.".to_string());
        }
        if !(f.initial_damping.is_finite() && f.initial_damping > 0.0) {
            return Err("`fit.initial_damping` must be finite and > 0.".to_string());
        }
        if !(f.export_step.is_finite() && f.export_step > 0.0) {
            return Err("`fit.export_step` must be finite and > 0.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_use_defaults() {
        let settings = AnalysisSettings::parse("").unwrap();
        assert_eq!(settings, AnalysisSettings::default());
        assert_eq!(settings.properties.reference_strain_low, 0.05);
        assert_eq!(settings.properties.reference_strain_high, 0.25);
        assert_eq!(settings.import.raw_header_lines, 3);
        assert_eq!(settings.fit.export_step, 0.01);
    }

    #[test]
    fn partial_settings_override_only_given_keys() {
        let toml = r#"
            [properties]
            reference_strain_high = 0.3

            [import]
            invalid_markers = ["invalid"]
        "#;

        let settings = AnalysisSettings::parse(toml).unwrap();
        assert_eq!(settings.properties.reference_strain_high, 0.3);
        assert_eq!(settings.properties.reference_strain_low, 0.05);
        assert_eq!(settings.import.invalid_markers, vec!["invalid".to_string()]);
        assert_eq!(settings.import.delimiter, ';');
    }

    #[test]
    fn rejects_equal_reference_strains() {
        let toml = r#"
            [properties]
            reference_strain_low = 0.1
            reference_strain_high = 0.1
        "#;
        assert!(AnalysisSettings::parse(toml).is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(AnalysisSettings::parse("[fit]\norder = 6\n").is_err());
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[fit]\nexport_step = -1.0\n").unwrap();

        let err = AnalysisSettings::from_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Settings { .. }));
        assert!(err.to_string().contains("settings.toml"));
    }
}
