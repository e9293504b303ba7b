//! `tensile-curves` library crate.
//!
//! The binary (`tensile`) is a thin wrapper around this library so that:
//!
//! - the specimen pipeline is testable without spawning processes
//! - the numeric core can be reused by other front-ends (plotting, notebooks)
//!   that consume the derived curves and properties

pub mod analysis;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
