//! Symbolic expression engine
//!
//! Builds scalar cost expressions over a decision vector and a parameter
//! vector, evaluates them numerically and differentiates them with respect to
//! the decision vector.

pub mod expr;
pub mod tape;
pub mod vector;

pub use expr::{Expr, Symbol, SymbolKind};
pub use tape::{Instruction, Tape};
pub use vector::{SymVec3, SymbolicVector};

use thiserror::Error;

/// Symbolic evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymbolicError {
    #[error("Invalid {kind} vector length: expected {expected}, got {got}")]
    LengthMismatch {
        kind: SymbolKind,
        expected: usize,
        got: usize,
    },
    #[error("Symbol {symbol} out of range for input of length {len}")]
    SymbolOutOfRange { symbol: Symbol, len: usize },
}
