//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves flags and the optional settings file into a `RunConfig`
//! - runs the pipeline and prints the report
//! - writes optional exports

use clap::Parser;

use crate::cli::{AnalyzeArgs, Command, CommonArgs, FitArgs};
use crate::domain::{AnalysisMode, AnalysisSettings, RunConfig, SpecimenSelector};
use crate::error::AppError;
use crate::io::curve::FitReportFile;

pub mod pipeline;

/// Entry point for the `tensile` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    let config = match cli.command {
        Command::Analyze(args) => {
            init_logging(args.common.verbose);
            analyze_config_from_args(&args)?
        }
        Command::Fit(args) => {
            init_logging(args.common.verbose);
            fit_config_from_args(&args)?
        }
    };

    let run = pipeline::run_pipeline(&config)?;
    println!("{}", crate::report::format_run_report(&run, &config));
    write_exports(&run, &config)
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn base_config(common: &CommonArgs, mode: AnalysisMode) -> Result<RunConfig, AppError> {
    let settings = match &common.settings {
        Some(path) => AnalysisSettings::from_file(path)?,
        None => AnalysisSettings::default(),
    };
    Ok(RunConfig {
        config_path: common.config.clone(),
        valid_only: common.valid_only,
        failure_policy: common.on_error,
        mode,
        settings,
        export_data: None,
        export_report: None,
        export_grid: None,
    })
}

pub fn analyze_config_from_args(args: &AnalyzeArgs) -> Result<RunConfig, AppError> {
    let mut config = base_config(&args.common, AnalysisMode::Batch)?;
    config.export_data = args.export.clone();
    Ok(config)
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    let selector = SpecimenSelector::parse(&args.specimen);
    let mut config = base_config(&args.common, AnalysisMode::BatchWithFit(selector))?;
    config.export_report = args.export_report.clone();
    config.export_grid = args.export_grid.clone();
    Ok(config)
}

fn write_exports(run: &pipeline::RunOutput, config: &RunConfig) -> Result<(), AppError> {
    if let Some(path) = &config.export_data {
        let specimens: Vec<_> = run.results.iter().map(|r| &r.specimen).collect();
        crate::io::export::write_derived_export(path, &specimens)?;
    }

    if config.export_report.is_none() && config.export_grid.is_none() {
        return Ok(());
    }
    let Some((specimen, fit)) = run.fitted_result() else {
        return Err(AppError::new(1, "No curve fit available to export."));
    };
    let report = FitReportFile::new(&specimen.specimen, fit, config.settings.fit.export_step);

    if let Some(path) = &config.export_report {
        crate::io::curve::write_fit_report_json(path, &report)?;
    }
    if let Some(path) = &config.export_grid {
        crate::io::curve::write_interpolation_csv(path, &report.grid)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_args_resolve_selector_and_exports() {
        let cli = crate::cli::Cli::try_parse_from([
            "tensile",
            "fit",
            "batch.csv",
            "--specimen",
            "2",
            "--export-grid",
            "grid.csv",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        let config = fit_config_from_args(&args).unwrap();
        assert_eq!(config.mode, AnalysisMode::BatchWithFit(SpecimenSelector::Index(2)));
        assert_eq!(config.export_grid.as_deref(), Some(std::path::Path::new("grid.csv")));
        assert!(config.export_report.is_none());
        assert_eq!(config.settings, AnalysisSettings::default());
    }

    #[test]
    fn missing_settings_file_is_input_error() {
        let cli = crate::cli::Cli::try_parse_from([
            "tensile",
            "analyze",
            "batch.csv",
            "--settings",
            "/nonexistent/settings.toml",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze subcommand");
        };
        let err = analyze_config_from_args(&args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
