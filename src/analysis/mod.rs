//! Per-specimen property extraction and batch aggregation.
//!
//! - `properties`: maximum detection and secant modulus for one specimen
//! - `batch`: cross-specimen max / mean / standard deviation

pub mod batch;
pub mod properties;

pub use batch::*;
pub use properties::*;
