//! Curve fitting.
//!
//! Responsibilities:
//!
//! - restrict a specimen to its pre-failure region
//! - fit the origin-pinned 8th-order polynomial (Levenberg–Marquardt)
//! - residual error metrics and the sampled interpolation grid

pub mod fitter;

pub use fitter::*;
