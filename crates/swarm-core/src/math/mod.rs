//! Mathematical utilities
//!
//! Numerical integrators shared by the symbolic cost model and the numeric
//! rollout.

pub mod integrator;

pub use integrator::*;
