//! Input/output helpers.
//!
//! - raw measurement files (`raw`)
//! - batch configuration ingest + specimen building (`ingest`)
//! - derived-data matrix export and re-import (`export`)
//! - curve-fit report JSON and interpolation grid CSV (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;
pub mod raw;

pub use curve::*;
pub use export::*;
pub use ingest::*;
pub use raw::*;
