//! The analysis pipeline shared by `tensile analyze` and `tensile fit`.
//!
//! config ingest -> (parallel) build + properties -> failure policy -> batch
//! statistics -> optional curve fit of one specimen
//!
//! The front-end only deals with presentation and exports.

use rayon::prelude::*;

use crate::analysis::{aggregate, extract_properties};
use crate::domain::{
    AnalysisMode, AnalysisSettings, BatchStatistics, CurveFitResult, FailurePolicy, RunConfig, SpecimenConfig,
    SpecimenFailure, SpecimenResult, SpecimenSelector,
};
use crate::error::PipelineError;
use crate::fit::fit_specimen;
use crate::io::ingest::{build_specimen, load_batch_config};

/// The curve fit of the selected specimen.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSpecimen {
    /// Position in `RunOutput::results`.
    pub index: usize,
    pub specimen_id: String,
    pub result: CurveFitResult,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Successfully analyzed specimens, in configuration order.
    pub results: Vec<SpecimenResult>,
    /// Specimens skipped under `FailurePolicy::Skip`.
    pub failures: Vec<SpecimenFailure>,
    /// `None` when fewer than two specimens survived.
    pub statistics: Option<BatchStatistics>,
    pub fit: Option<FittedSpecimen>,
    pub rows_read: usize,
    pub excluded_invalid: usize,
}

impl RunOutput {
    pub fn fitted_result(&self) -> Option<(&SpecimenResult, &CurveFitResult)> {
        self.fit
            .as_ref()
            .and_then(|f| self.results.get(f.index).map(|r| (r, &f.result)))
    }
}

/// A configuration row or specimen that failed, keyed by its config line.
struct Failed {
    line: usize,
    id: Option<String>,
    error: PipelineError,
}

/// Execute the full pipeline for a run configuration.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, PipelineError> {
    let settings = &config.settings;
    let batch = load_batch_config(&config.config_path, &settings.import, config.valid_only)?;
    log::info!(
        "Loaded {} specimens from '{}' ({} rows, {} excluded as invalid, {} malformed)",
        batch.specimens.len(),
        config.config_path.display(),
        batch.rows_read,
        batch.excluded_invalid,
        batch.row_errors.len()
    );

    let outcomes: Vec<Result<SpecimenResult, PipelineError>> = batch
        .specimens
        .par_iter()
        .map(|specimen_config| analyze_specimen(specimen_config, settings))
        .collect();

    let mut failed: Vec<Failed> = batch
        .row_errors
        .into_iter()
        .map(|error| {
            let (line, id) = match &error {
                PipelineError::Config { line, id, .. } => (*line, id.clone()),
                _ => (0, None),
            };
            Failed { line, id, error }
        })
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    for (specimen_config, outcome) in batch.specimens.iter().zip(outcomes) {
        match outcome {
            Ok(result) => results.push(result),
            Err(error) => failed.push(Failed {
                line: specimen_config.line,
                id: Some(specimen_config.id.clone()),
                error,
            }),
        }
    }
    failed.sort_by_key(|f| f.line);

    let failures = apply_failure_policy(config.failure_policy, failed)?;

    if results.is_empty() {
        return Err(PipelineError::InsufficientSamples {
            context: "batch analysis".to_string(),
            needed: 1,
            got: 0,
        });
    }

    let properties: Vec<_> = results.iter().map(|r| r.properties).collect();
    let statistics = match aggregate(&properties) {
        Ok(stats) => Some(stats),
        Err(PipelineError::InsufficientSamples { needed, got, .. }) => {
            log::warn!("Batch statistics need at least {needed} specimens, got {got}; skipping");
            None
        }
        Err(e) => return Err(e),
    };

    let fit = match &config.mode {
        AnalysisMode::Batch => None,
        AnalysisMode::BatchWithFit(selector) => Some(fit_selected(&results, selector, settings)?),
    };

    log::info!(
        "Analyzed {} specimens ({} skipped)",
        results.len(),
        failures.len()
    );

    Ok(RunOutput {
        results,
        failures,
        statistics,
        fit,
        rows_read: batch.rows_read,
        excluded_invalid: batch.excluded_invalid,
    })
}

/// Build one specimen and extract its properties.
pub fn analyze_specimen(
    config: &SpecimenConfig,
    settings: &AnalysisSettings,
) -> Result<SpecimenResult, PipelineError> {
    let specimen = build_specimen(config, &settings.import)?;
    let properties = extract_properties(&specimen, &settings.properties)?;
    log::debug!(
        "Specimen '{}': n={} max_stress={:.4} strain_at_max={:.4} E={:.4}",
        specimen.id(),
        specimen.len(),
        properties.max_stress,
        properties.strain_at_max_stress,
        properties.youngs_modulus
    );
    Ok(SpecimenResult { specimen, properties })
}

fn apply_failure_policy(
    policy: FailurePolicy,
    failed: Vec<Failed>,
) -> Result<Vec<SpecimenFailure>, PipelineError> {
    let mut failures = Vec::with_capacity(failed.len());
    for Failed { line, id, error } in failed {
        match policy {
            FailurePolicy::Abort => {
                return Err(match id {
                    Some(id) => error.for_specimen(id),
                    None => error,
                });
            }
            FailurePolicy::Skip => {
                let id = id.unwrap_or_else(|| format!("<line {line}>"));
                log::warn!("Skipping specimen '{id}' (line {line}): {error}");
                failures.push(SpecimenFailure {
                    id,
                    line,
                    message: error.to_string(),
                });
            }
        }
    }
    Ok(failures)
}

/// Resolve a selector against the analyzed specimens.
pub fn resolve_selector(results: &[SpecimenResult], selector: &SpecimenSelector) -> Result<usize, PipelineError> {
    let found = match selector {
        SpecimenSelector::Index(idx) => (*idx < results.len()).then_some(*idx),
        SpecimenSelector::Id(id) => results.iter().position(|r| r.specimen.id() == id),
    };
    found.ok_or_else(|| PipelineError::UnknownSpecimen {
        selector: match selector {
            SpecimenSelector::Index(idx) => idx.to_string(),
            SpecimenSelector::Id(id) => id.clone(),
        },
        available: results.len(),
    })
}

fn fit_selected(
    results: &[SpecimenResult],
    selector: &SpecimenSelector,
    settings: &AnalysisSettings,
) -> Result<FittedSpecimen, PipelineError> {
    let index = resolve_selector(results, selector)?;
    let specimen = &results[index].specimen;
    let result = fit_specimen(specimen, &settings.fit).map_err(|e| e.for_specimen(specimen.id()))?;
    log::info!(
        "Fitted specimen '{}' over {} samples in {} iterations",
        specimen.id(),
        result.sample_count,
        result.iterations
    );
    Ok(FittedSpecimen {
        index,
        specimen_id: specimen.id().to_string(),
        result,
    })
}
