//! Command-line parsing for the tensile-test analyzer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! import, analysis and fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::FailurePolicy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tensile", version, about = "Tensile-test batch analyzer and curve fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a batch, print per-specimen properties and batch statistics.
    Analyze(AnalyzeArgs),
    /// Analyze a batch and fit the pre-failure curve of one specimen.
    Fit(FitArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Batch configuration file (`;`-separated, one specimen per row).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Only process specimens marked valid in the configuration.
    #[arg(long)]
    pub valid_only: bool,

    /// What to do when a specimen cannot be imported or analyzed.
    #[arg(long = "on-error", value_enum, default_value_t = FailurePolicy::Abort)]
    pub on_error: FailurePolicy,

    /// TOML file overriding the analysis settings.
    #[arg(long, value_name = "TOML")]
    pub settings: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Export the batch's stress-strain curves to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Specimen to fit: a batch position (0-based) or a specimen id.
    #[arg(long, default_value = "0")]
    pub specimen: String,

    /// Export the curve-fit report (coefficients, metrics, grid) to JSON.
    #[arg(long = "export-report", value_name = "JSON")]
    pub export_report: Option<PathBuf>,

    /// Export the interpolation grid to CSV.
    #[arg(long = "export-grid", value_name = "CSV")]
    pub export_grid: Option<PathBuf>,
}
