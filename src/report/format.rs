//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the analysis/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::domain::{AnalysisMode, BatchStatistics, CurveFitResult, RunConfig, SpecimenFailure, SpecimenResult};

/// Format the complete report of one run.
pub fn format_run_report(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str("=== tensile - Tensile Test Analysis ===\n");
    out.push_str(&format!("Config: {}\n", config.config_path.display()));
    out.push_str(&format!(
        "Rows: {} | analyzed={} | skipped={} | excluded invalid={}\n",
        run.rows_read,
        run.results.len(),
        run.failures.len(),
        run.excluded_invalid
    ));
    out.push('\n');

    out.push_str("Specimens:\n");
    out.push_str(&format_specimen_table(&run.results));

    if !run.failures.is_empty() {
        out.push_str("\nSkipped:\n");
        out.push_str(&format_failures(&run.failures));
    }

    out.push_str("\nBatch statistics:\n");
    out.push_str(&format_batch_statistics(run.statistics.as_ref()));

    if let (AnalysisMode::BatchWithFit(_), Some((result, fit))) = (&config.mode, run.fitted_result()) {
        out.push_str(&format!("\nCurve fit (specimen '{}'):\n", result.specimen.id()));
        out.push_str(&format_fit_report(fit));
    }

    out
}

/// One row per specimen with its derived properties.
pub fn format_specimen_table(results: &[SpecimenResult]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<16} {:>8} {:>12} {:>14} {:>14} {:<5}",
            "id", "n", "max_stress", "strain_at_max", "E_secant", "valid"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<16} {:-<8} {:-<12} {:-<14} {:-<14} {:-<5}", "", "", "", "", "", ""),
    );

    for r in results {
        let p = &r.properties;
        push_line(
            &mut out,
            format!(
                "{:<16} {:>8} {:>12.4} {:>14.4} {:>14.2} {:<5}",
                truncate(r.specimen.id(), 16),
                p.sample_count,
                p.max_stress,
                p.strain_at_max_stress,
                p.youngs_modulus,
                if r.specimen.config.is_valid { "yes" } else { "no" },
            ),
        );
    }
    out
}

/// Batch statistics table, or a note when too few specimens were analyzed.
pub fn format_batch_statistics(stats: Option<&BatchStatistics>) -> String {
    let Some(stats) = stats else {
        return "(not available: at least two specimens are required)\n".to_string();
    };

    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<22} {:>12} {:>12} {:>12} {:>12}",
            "property", "max", "mean", "std_dev", "pop_std_dev"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<22} {:-<12} {:-<12} {:-<12} {:-<12}", "", "", "", "", ""),
    );
    for (name, s) in stats.entries() {
        push_line(
            &mut out,
            format!(
                "{:<22} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                name, s.max, s.mean, s.std_dev, s.population_std_dev
            ),
        );
    }
    out.push_str(&format!(
        "strain at overall max stress: {:.4}\n",
        stats.strain_of_max_max_stress
    ));
    out
}

/// Coefficients, domain and error metrics of a fit.
pub fn format_fit_report(fit: &CurveFitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "- domain: [{:.4}, {:.4}] ({} samples, {} iterations)\n",
        fit.domain.0, fit.domain.1, fit.sample_count, fit.iterations
    ));
    for (k, a) in fit.coefficients.iter().enumerate() {
        out.push_str(&format!("- a{}: {a:.6e}\n", k + 1));
    }
    out.push_str(&format!("- rms error (mean |residual|): {:.6}\n", fit.rms_error));
    out.push_str(&format!("- max absolute error: {:.6}\n", fit.max_absolute_error));
    out.push_str(&format!(
        "- max relative error: {:.4}%\n",
        fit.max_relative_error * 100.0
    ));
    out
}

fn format_failures(failures: &[SpecimenFailure]) -> String {
    let mut out = String::new();
    for f in failures {
        out.push_str(&format!("- {} (line {}): {}\n", f.id, f.line, f.message));
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PropertyStats;

    fn stats(max: f64) -> PropertyStats {
        PropertyStats {
            max,
            mean: max / 2.0,
            std_dev: 1.0,
            population_std_dev: 0.5,
            count: 2,
        }
    }

    #[test]
    fn batch_statistics_lists_every_property() {
        let batch = BatchStatistics {
            max_stress: stats(50.0),
            strain_at_max_stress: stats(3.0),
            youngs_modulus: stats(1200.0),
            strain_of_max_max_stress: 1.5,
        };
        let text = format_batch_statistics(Some(&batch));
        assert!(text.contains("max_stress"));
        assert!(text.contains("strain_at_max_stress"));
        assert!(text.contains("youngs_modulus"));
        assert!(text.contains("1200.0000"));
        assert!(text.ends_with("strain at overall max stress: 1.5000\n"));
    }

    #[test]
    fn missing_statistics_are_explained() {
        assert!(format_batch_statistics(None).contains("at least two specimens"));
    }

    #[test]
    fn fit_report_shows_relative_error_as_percent() {
        let fit = CurveFitResult {
            coefficients: [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5],
            domain: (0.0, 2.5),
            rms_error: 0.1,
            max_absolute_error: 0.2,
            max_relative_error: 0.0125,
            sample_count: 12,
            iterations: 3,
        };
        let text = format_fit_report(&fit);
        assert!(text.contains("- a8: 5.000000e-1"));
        assert!(text.contains("max relative error: 1.2500%"));
        assert!(text.starts_with("- domain: [0.0000, 2.5000] (12 samples, 3 iterations)"));
    }

    #[test]
    fn long_ids_are_truncated() {
        assert_eq!(truncate("abcdefgh", 5), "abcd.");
        assert_eq!(truncate("abc", 5), "abc");
    }
}
