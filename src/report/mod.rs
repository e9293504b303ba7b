//! Plain-text terminal report: specimen table, batch statistics and fit summary.

pub mod format;

pub use format::*;
