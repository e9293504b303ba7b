//! Stress-strain model implementations.
//!
//! Models are implemented as small, pure functions so that fitting and export code
//! can stay generic.

pub mod model;

pub use model::*;
