//! Cross-specimen statistics.
//!
//! A pure reduction over the per-specimen derived properties. The sample standard
//! deviation is undefined for a single specimen, so batches with fewer than two
//! results fail with `InsufficientSamples` rather than reporting a fallback value.

use crate::domain::{BatchStatistics, DerivedProperties, PropertyStats};
use crate::error::PipelineError;
use crate::math::{first_argmax, mean, std_dev};

/// Minimum number of specimens for batch statistics.
pub const MIN_BATCH_SIZE: usize = 2;

/// Aggregate derived properties across a batch.
pub fn aggregate(properties: &[DerivedProperties]) -> Result<BatchStatistics, PipelineError> {
    if properties.len() < MIN_BATCH_SIZE {
        return Err(PipelineError::InsufficientSamples {
            context: "batch statistics".to_string(),
            needed: MIN_BATCH_SIZE,
            got: properties.len(),
        });
    }

    let max_stress: Vec<f64> = properties.iter().map(|p| p.max_stress).collect();
    let strain: Vec<f64> = properties.iter().map(|p| p.strain_at_max_stress).collect();
    let modulus: Vec<f64> = properties.iter().map(|p| p.youngs_modulus).collect();

    let idx = first_argmax(&max_stress).ok_or_else(|| non_finite("max_stress"))?;

    Ok(BatchStatistics {
        max_stress: property_stats("max_stress", &max_stress)?,
        strain_at_max_stress: property_stats("strain_at_max_stress", &strain)?,
        youngs_modulus: property_stats("youngs_modulus", &modulus)?,
        strain_of_max_max_stress: strain[idx],
    })
}

fn property_stats(name: &str, values: &[f64]) -> Result<PropertyStats, PipelineError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(non_finite(name));
    }
    let insufficient = || PipelineError::InsufficientSamples {
        context: format!("`{name}` statistics"),
        needed: MIN_BATCH_SIZE,
        got: values.len(),
    };

    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(PropertyStats {
        max,
        mean: mean(values).ok_or_else(insufficient)?,
        std_dev: std_dev(values, 1).ok_or_else(insufficient)?,
        population_std_dev: std_dev(values, 0).ok_or_else(insufficient)?,
        count: values.len(),
    })
}

fn non_finite(name: &str) -> PipelineError {
    PipelineError::DegenerateCurve {
        id: "<batch>".to_string(),
        message: format!("non-finite `{name}` value in batch"),
    }
}
