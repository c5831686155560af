//! Symbolic vectors
//!
//! [`SymbolicVector`] is a named, flat vector of fresh symbols (the decision
//! or parameter vector). [`SymVec3`] is a fixed three-component vector of
//! arbitrary expressions used for positions and velocities.

use std::ops::{Index, Range};

use nalgebra::Vector3;

use super::expr::{Expr, SymbolKind};
use super::SymbolicError;

/// Flat vector of symbols `name[0] .. name[len-1]`
#[derive(Debug, Clone)]
pub struct SymbolicVector {
    name: String,
    kind: SymbolKind,
    elements: Vec<Expr>,
}

impl SymbolicVector {
    pub fn new(name: impl Into<String>, kind: SymbolKind, len: usize) -> Self {
        let elements = (0..len)
            .map(|index| match kind {
                SymbolKind::Decision => Expr::decision(index),
                SymbolKind::Parameter => Expr::parameter(index),
            })
            .collect();
        Self {
            name: name.into(),
            kind,
            elements,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Expr> {
        self.elements.get(index)
    }

    /// Contiguous sub-range, `None` if it runs past the end
    pub fn slice(&self, range: Range<usize>) -> Option<&[Expr]> {
        self.elements.get(range)
    }

    pub fn as_slice(&self) -> &[Expr] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.elements.iter()
    }
}

impl Index<usize> for SymbolicVector {
    type Output = Expr;

    fn index(&self, index: usize) -> &Expr {
        &self.elements[index]
    }
}

/// Three-component symbolic vector
#[derive(Debug, Clone)]
pub struct SymVec3 {
    components: [Expr; 3],
}

impl SymVec3 {
    pub fn new(x: Expr, y: Expr, z: Expr) -> Self {
        Self {
            components: [x, y, z],
        }
    }

    /// First three elements of `slice`, `None` if it is shorter than 3
    pub fn from_slice(slice: &[Expr]) -> Option<Self> {
        match slice {
            [x, y, z, ..] => Some(Self::new(x.clone(), y.clone(), z.clone())),
            _ => None,
        }
    }

    pub fn from_vector3(v: &Vector3<f64>) -> Self {
        Self::new(Expr::constant(v.x), Expr::constant(v.y), Expr::constant(v.z))
    }

    pub fn x(&self) -> &Expr {
        &self.components[0]
    }

    pub fn y(&self) -> &Expr {
        &self.components[1]
    }

    pub fn z(&self) -> &Expr {
        &self.components[2]
    }

    pub fn sub(&self, other: &SymVec3) -> SymVec3 {
        self.zip_map(other, |a, b| a - b)
    }

    pub fn dot(&self, other: &SymVec3) -> Expr {
        self.components
            .iter()
            .zip(other.components.iter())
            .fold(Expr::zero(), |acc, (a, b)| acc + a * b)
    }

    pub fn norm_squared(&self) -> Expr {
        self.dot(self)
    }

    /// `‖self - other‖²`
    pub fn distance_squared(&self, other: &SymVec3) -> Expr {
        self.sub(other).norm_squared()
    }

    /// `self += factor * other`
    pub fn axpy(&mut self, factor: f64, other: &SymVec3) {
        for (c, o) in self.components.iter_mut().zip(other.components.iter()) {
            *c += o * factor;
        }
    }

    pub fn eval(&self, decision: &[f64], parameters: &[f64]) -> Result<Vector3<f64>, SymbolicError> {
        Ok(Vector3::new(
            self.x().eval(decision, parameters)?,
            self.y().eval(decision, parameters)?,
            self.z().eval(decision, parameters)?,
        ))
    }

    fn zip_map(&self, other: &SymVec3, f: impl Fn(&Expr, &Expr) -> Expr) -> SymVec3 {
        SymVec3::new(
            f(self.x(), other.x()),
            f(self.y(), other.y()),
            f(self.z(), other.z()),
        )
    }
}
