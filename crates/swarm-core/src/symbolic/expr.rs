//! Scalar symbolic expressions
//!
//! An [`Expr`] is an immutable node in a reference-counted DAG. Cloning an
//! expression only bumps a counter, so shared sub-expressions (e.g. a
//! vehicle position reused by tracking and collision terms) are stored once.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tape::Tape;
use super::SymbolicError;

/// Which input vector a symbol is bound to at evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// Optimized over by the solver (control inputs)
    Decision,
    /// Bound to numeric values at solve time (initial / reference states)
    Parameter,
}

impl SymbolKind {
    /// Short name used when printing expressions
    pub fn prefix(&self) -> &'static str {
        match self {
            SymbolKind::Decision => "u",
            SymbolKind::Parameter => "z0",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Decision => write!(f, "decision"),
            SymbolKind::Parameter => write!(f, "parameter"),
        }
    }
}

/// A scalar placeholder: element `index` of the decision or parameter vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub index: usize,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind.prefix(), self.index)
    }
}

#[derive(Debug)]
pub(crate) enum Node {
    Const(f64),
    Symbol(Symbol),
    Neg(Expr),
    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Max(Expr, Expr),
}

/// Symbolic scalar expression
#[derive(Clone)]
pub struct Expr(Arc<Node>);

/// Releases long chains without recursing once per level
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut expr) = pending.pop() {
            detach_children(&mut expr, &mut pending);
        }
    }
}

/// Move the children of a uniquely owned node onto `out`
///
/// The node is left as a constant, so dropping it afterwards does no further work.
fn detach_children(expr: &mut Expr, out: &mut Vec<Expr>) {
    let Some(node) = Arc::get_mut(&mut expr.0) else {
        return;
    };
    if matches!(node, Node::Const(_) | Node::Symbol(_)) {
        return;
    }
    match std::mem::replace(node, Node::Const(0.0)) {
        Node::Const(_) | Node::Symbol(_) => {}
        Node::Neg(a) => out.push(a),
        Node::Add(a, b) | Node::Sub(a, b) | Node::Mul(a, b) | Node::Max(a, b) => {
            out.push(a);
            out.push(b);
        }
    }
}

impl Expr {
    fn from_node(node: Node) -> Self {
        Expr(Arc::new(node))
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    /// Stable identity of the underlying node (used for DAG deduplication)
    pub(crate) fn id(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }

    pub fn constant(value: f64) -> Self {
        Self::from_node(Node::Const(value))
    }

    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    pub fn one() -> Self {
        Self::constant(1.0)
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Self::from_node(Node::Symbol(symbol))
    }

    pub fn decision(index: usize) -> Self {
        Self::symbol(Symbol { kind: SymbolKind::Decision, index })
    }

    pub fn parameter(index: usize) -> Self {
        Self::symbol(Symbol { kind: SymbolKind::Parameter, index })
    }

    /// Value of the expression if it folded down to a constant
    pub fn as_constant(&self) -> Option<f64> {
        match self.node() {
            Node::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// Symbol if the expression is a bare symbol
    pub fn as_symbol(&self) -> Option<Symbol> {
        match self.node() {
            Node::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    fn is_constant(&self, value: f64) -> bool {
        self.as_constant() == Some(value)
    }

    /// Element-wise maximum `max(self, other)`
    pub fn max(&self, other: &Expr) -> Expr {
        match (self.as_constant(), other.as_constant()) {
            (Some(a), Some(b)) => Expr::constant(a.max(b)),
            _ => Expr::from_node(Node::Max(self.clone(), other.clone())),
        }
    }

    /// Hinge `max(0, self)`
    ///
    /// Non-differentiable where `self == 0`; [`Tape::gradient`] assigns the
    /// zero branch there.
    pub fn hinge(&self) -> Expr {
        Expr::zero().max(self)
    }

    pub fn square(&self) -> Expr {
        self * self
    }

    /// Number of distinct nodes reachable from this expression
    pub fn node_count(&self) -> usize {
        Tape::from_expr(self).len()
    }

    /// Evaluate with numeric decision and parameter values
    ///
    /// Every symbol index must be in range of the provided slices.
    pub fn eval(&self, decision: &[f64], parameters: &[f64]) -> Result<f64, SymbolicError> {
        Tape::compile(self, decision.len(), parameters.len())?.eval(decision, parameters)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::symbol(symbol)
    }
}

fn add(a: &Expr, b: &Expr) -> Expr {
    match (a.as_constant(), b.as_constant()) {
        (Some(x), Some(y)) => Expr::constant(x + y),
        (Some(x), None) if x == 0.0 => b.clone(),
        (None, Some(y)) if y == 0.0 => a.clone(),
        _ => Expr::from_node(Node::Add(a.clone(), b.clone())),
    }
}

fn sub(a: &Expr, b: &Expr) -> Expr {
    match (a.as_constant(), b.as_constant()) {
        (Some(x), Some(y)) => Expr::constant(x - y),
        (Some(x), None) if x == 0.0 => neg(b),
        (None, Some(y)) if y == 0.0 => a.clone(),
        _ => Expr::from_node(Node::Sub(a.clone(), b.clone())),
    }
}

fn mul(a: &Expr, b: &Expr) -> Expr {
    if a.is_constant(0.0) || b.is_constant(0.0) {
        return Expr::zero();
    }
    match (a.as_constant(), b.as_constant()) {
        (Some(x), Some(y)) => Expr::constant(x * y),
        (Some(x), None) if x == 1.0 => b.clone(),
        (None, Some(y)) if y == 1.0 => a.clone(),
        _ => Expr::from_node(Node::Mul(a.clone(), b.clone())),
    }
}

fn neg(a: &Expr) -> Expr {
    match a.node() {
        Node::Const(c) => Expr::constant(-c),
        Node::Neg(inner) => inner.clone(),
        _ => Expr::from_node(Node::Neg(a.clone())),
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $func:ident) => {
        impl $trait<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(self, rhs)
            }
        }

        impl $trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(&self, &rhs)
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(&self, rhs)
            }
        }

        impl $trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(self, &rhs)
            }
        }

        impl $trait<f64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $func(self, &Expr::constant(rhs))
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $func(&self, &Expr::constant(rhs))
            }
        }

        impl $trait<&Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(&Expr::constant(self), rhs)
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(&Expr::constant(self), &rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, add);
impl_binary_op!(Sub, sub, sub);
impl_binary_op!(Mul, mul, mul);

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        neg(self)
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        neg(&self)
    }
}

impl AddAssign<Expr> for Expr {
    fn add_assign(&mut self, rhs: Expr) {
        *self = add(self, &rhs);
    }
}

impl AddAssign<&Expr> for Expr {
    fn add_assign(&mut self, rhs: &Expr) {
        *self = add(self, rhs);
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Piece<'a> {
            Expr(&'a Expr),
            Text(&'static str),
        }

        // Explicit stack, pieces pushed in reverse print order
        let mut stack = vec![Piece::Expr(self)];
        while let Some(piece) = stack.pop() {
            let expr = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Expr(expr) => expr,
            };
            let (open, a, op, b, close) = match expr.node() {
                Node::Const(c) => {
                    write!(f, "{}", c)?;
                    continue;
                }
                Node::Symbol(s) => {
                    write!(f, "{}", s)?;
                    continue;
                }
                Node::Neg(a) => {
                    stack.extend([Piece::Text(")"), Piece::Expr(a), Piece::Text("(-")]);
                    continue;
                }
                Node::Add(a, b) => ("(", a, "+", b, ")"),
                Node::Sub(a, b) => ("(", a, "-", b, ")"),
                Node::Mul(a, b) => ("(", a, "*", b, ")"),
                Node::Max(a, b) => ("fmax(", a, ",", b, ")"),
            };
            stack.extend([
                Piece::Text(close),
                Piece::Expr(b),
                Piece::Text(op),
                Piece::Expr(a),
                Piece::Text(open),
            ]);
        }
        Ok(())
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({})", self)
    }
}
