//! # Swarm Core
//!
//! Math layer for multi-vehicle trajectory cost models.
//!
//! ## Modules
//!
//! - [`symbolic`]: Symbolic scalar expressions, symbol vectors, compiled tapes
//! - [`math`]: Integrators (forward Euler for numeric and symbolic states)

pub mod math;
pub mod symbolic;

pub use symbolic::{Expr, SymVec3, SymbolKind, SymbolicError, SymbolicVector, Tape};
