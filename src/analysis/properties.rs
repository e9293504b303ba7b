//! Derived properties of one specimen.
//!
//! - maximum stress and the strain at which it occurs (first index on ties)
//! - secant modulus between the samples closest to two reference strains
//!
//! The secant endpoints are actual samples, not the reference strains themselves.

use crate::domain::{DerivedProperties, PropertySettings, Specimen};
use crate::error::PipelineError;
use crate::math::{first_argmax, nearest_index};

/// Compute the derived properties of a built specimen.
pub fn extract_properties(
    specimen: &Specimen,
    settings: &PropertySettings,
) -> Result<DerivedProperties, PipelineError> {
    specimen.check_aligned()?;
    let (max_index, max_stress) = max_stress(specimen)?;
    let youngs_modulus = secant_modulus(specimen, settings)?;

    Ok(DerivedProperties {
        max_stress,
        strain_at_max_stress: specimen.strain[max_index],
        youngs_modulus,
        max_index,
        sample_count: specimen.len(),
    })
}

/// Index and value of the first maximum of the stress curve.
pub fn max_stress(specimen: &Specimen) -> Result<(usize, f64), PipelineError> {
    specimen.check_aligned()?;
    let idx = first_argmax(&specimen.stress).ok_or_else(|| PipelineError::DegenerateCurve {
        id: specimen.id().to_string(),
        message: "stress curve is empty or contains NaN".to_string(),
    })?;
    Ok((idx, specimen.stress[idx]))
}

/// Two-point secant slope, scaled by `settings.modulus_scale`.
pub fn secant_modulus(specimen: &Specimen, settings: &PropertySettings) -> Result<f64, PipelineError> {
    specimen.check_aligned()?;
    let degenerate = |message: String| PipelineError::DegenerateCurve {
        id: specimen.id().to_string(),
        message,
    };

    let i1 = nearest_index(&specimen.strain, settings.reference_strain_low)
        .ok_or_else(|| degenerate("strain curve is empty or contains NaN".to_string()))?;
    let i2 = nearest_index(&specimen.strain, settings.reference_strain_high)
        .ok_or_else(|| degenerate("strain curve is empty or contains NaN".to_string()))?;

    let (eps1, sigma1) = (specimen.strain[i1], specimen.stress[i1]);
    let (eps2, sigma2) = (specimen.strain[i2], specimen.stress[i2]);

    let d_eps = eps2 - eps1;
    if d_eps == 0.0 {
        return Err(degenerate(format!(
            "secant endpoints have equal strain {eps1} (samples {i1} and {i2})"
        )));
    }

    let modulus = settings.modulus_scale * (sigma2 - sigma1) / d_eps;
    if !modulus.is_finite() {
        return Err(degenerate(format!("non-finite secant modulus {modulus}")));
    }
    Ok(modulus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpecimenConfig;
    use std::path::PathBuf;

    fn specimen(strain: Vec<f64>, stress: Vec<f64>) -> Specimen {
        Specimen {
            config: SpecimenConfig {
                id: "T1".to_string(),
                width: 10.0,
                thickness: 2.0,
                length: 50.0,
                force_offset: 0.0,
                is_valid: true,
                color: None,
                source_file: PathBuf::from("t1.txt"),
                line: 3,
            },
            strain,
            stress,
        }
    }

    #[test]
    fn strain_at_max_is_index_aligned() {
        let s = specimen(
            vec![0.0, 0.04, 0.1, 0.26, 0.5, 0.7],
            vec![0.0, 2.0, 5.0, 13.0, 20.0, 18.0],
        );
        let props = extract_properties(&s, &PropertySettings::default()).unwrap();
        assert_eq!(props.max_index, 4);
        assert_eq!(props.max_stress, 20.0);
        assert_eq!(props.strain_at_max_stress, s.strain[props.max_index]);
        assert_eq!(props.sample_count, 6);

        // Nearest to 0.05 is 0.04 (index 1), nearest to 0.25 is 0.26 (index 3).
        let expected = 100.0 * (13.0 - 2.0) / (0.26 - 0.04);
        assert!((props.youngs_modulus - expected).abs() < 1e-9);
    }

    #[test]
    fn plateau_maximum_takes_first_index() {
        let s = specimen(vec![0.0, 0.1, 0.2, 0.3], vec![0.0, 7.0, 7.0, 3.0]);
        let (idx, value) = max_stress(&s).unwrap();
        assert_eq!((idx, value), (1, 7.0));
    }

    #[test]
    fn halfway_references_pick_first_sample() {
        // References sit exactly between samples 0/1 and 1/2.
        let s = specimen(vec![0.0, 0.5, 1.0], vec![0.0, 10.0, 30.0]);
        let settings = PropertySettings {
            reference_strain_low: 0.25,
            reference_strain_high: 0.75,
            modulus_scale: 100.0,
        };
        for _ in 0..5 {
            let e = secant_modulus(&s, &settings).unwrap();
            assert_eq!(e, 100.0 * (10.0 - 0.0) / (0.5 - 0.0));
        }
    }

    #[test]
    fn reference_scenario_modulus_with_sample_references() {
        let s = specimen(vec![0.0, 0.1, 0.5, 0.6], vec![0.0, 5.0, 10.0, 7.5]);
        let settings = PropertySettings {
            reference_strain_low: 0.1,
            reference_strain_high: 0.5,
            modulus_scale: 100.0,
        };
        let e = secant_modulus(&s, &settings).unwrap();
        assert!((e - 1250.0).abs() < 1e-9, "got {e}");
    }

    #[test]
    fn mismatched_lengths_are_degenerate_not_a_panic() {
        let s = specimen(vec![0.0, 0.1], vec![0.0, 5.0, 10.0, 7.5]);
        let err = extract_properties(&s, &PropertySettings::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateCurve { .. }), "{err}");
    }

    #[test]
    fn equal_secant_strains_are_degenerate() {
        // Both references resolve to the single sample.
        let s = specimen(vec![0.0], vec![0.0]);
        let err = secant_modulus(&s, &PropertySettings::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateCurve { .. }), "{err}");

        // Strain never moves.
        let s = specimen(vec![0.0, 0.0, 0.0], vec![0.0, 1.0, 2.0]);
        assert!(extract_properties(&s, &PropertySettings::default()).is_err());
    }
}
