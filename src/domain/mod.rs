//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - specimen configuration and built curves (`SpecimenConfig`, `Specimen`)
//! - derived outputs (`DerivedProperties`, `BatchStatistics`, `CurveFitResult`)
//! - run configuration (`RunConfig`, `AnalysisSettings`, `FailurePolicy`)

pub mod settings;
pub mod types;

pub use settings::*;
pub use types::*;
