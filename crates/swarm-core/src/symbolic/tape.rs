//! Flattened expression tape
//!
//! Compiles an [`Expr`] DAG into a topologically ordered instruction list.
//! Shared nodes appear exactly once, so a forward pass costs one operation
//! per distinct node and a reverse sweep yields the gradient with respect to
//! the decision symbols.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::expr::{Expr, Node, Symbol, SymbolKind};
use super::SymbolicError;

/// One tape slot; operands refer to earlier slots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Const(f64),
    Symbol(Symbol),
    Neg(usize),
    Add(usize, usize),
    Sub(usize, usize),
    Mul(usize, usize),
    Max(usize, usize),
}

/// Compiled expression, output in the last slot
#[derive(Debug, Clone, Serialize)]
pub struct Tape {
    instructions: Vec<Instruction>,
    num_decision: usize,
    num_parameters: usize,
}

impl Tape {
    /// Compile `expr` for decision/parameter vectors of the given lengths
    pub fn compile(
        expr: &Expr,
        num_decision: usize,
        num_parameters: usize,
    ) -> Result<Self, SymbolicError> {
        let mut tape = Self::from_expr(expr);
        for instruction in &tape.instructions {
            if let Instruction::Symbol(symbol) = instruction {
                let len = match symbol.kind {
                    SymbolKind::Decision => num_decision,
                    SymbolKind::Parameter => num_parameters,
                };
                if symbol.index >= len {
                    return Err(SymbolicError::SymbolOutOfRange { symbol: *symbol, len });
                }
            }
        }
        tape.num_decision = num_decision;
        tape.num_parameters = num_parameters;
        Ok(tape)
    }

    /// Flatten without range checks; input lengths are the smallest that fit
    pub(crate) fn from_expr(expr: &Expr) -> Self {
        let mut instructions: Vec<Instruction> = Vec::new();
        let mut slots: HashMap<*const (), usize> = HashMap::new();
        let mut num_decision = 0;
        let mut num_parameters = 0;

        // Iterative post-order walk; long cost chains would overflow a recursive one
        let mut stack: Vec<(&Expr, bool)> = vec![(expr, false)];
        while let Some((current, expanded)) = stack.pop() {
            if slots.contains_key(&current.id()) {
                continue;
            }

            if !expanded {
                stack.push((current, true));
                match current.node() {
                    Node::Const(_) | Node::Symbol(_) => {}
                    Node::Neg(a) => stack.push((a, false)),
                    Node::Add(a, b) | Node::Sub(a, b) | Node::Mul(a, b) | Node::Max(a, b) => {
                        stack.push((b, false));
                        stack.push((a, false));
                    }
                }
                continue;
            }

            let slot = |e: &Expr| slots[&e.id()];
            let instruction = match current.node() {
                Node::Const(c) => Instruction::Const(*c),
                Node::Symbol(s) => {
                    match s.kind {
                        SymbolKind::Decision => num_decision = num_decision.max(s.index + 1),
                        SymbolKind::Parameter => num_parameters = num_parameters.max(s.index + 1),
                    }
                    Instruction::Symbol(*s)
                }
                Node::Neg(a) => Instruction::Neg(slot(a)),
                Node::Add(a, b) => Instruction::Add(slot(a), slot(b)),
                Node::Sub(a, b) => Instruction::Sub(slot(a), slot(b)),
                Node::Mul(a, b) => Instruction::Mul(slot(a), slot(b)),
                Node::Max(a, b) => Instruction::Max(slot(a), slot(b)),
            };
            slots.insert(current.id(), instructions.len());
            instructions.push(instruction);
        }

        Self {
            instructions,
            num_decision,
            num_parameters,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Expected decision vector length
    pub fn num_decision(&self) -> usize {
        self.num_decision
    }

    /// Expected parameter vector length
    pub fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    fn check_inputs(&self, decision: &[f64], parameters: &[f64]) -> Result<(), SymbolicError> {
        if decision.len() != self.num_decision {
            return Err(SymbolicError::LengthMismatch {
                kind: SymbolKind::Decision,
                expected: self.num_decision,
                got: decision.len(),
            });
        }
        if parameters.len() != self.num_parameters {
            return Err(SymbolicError::LengthMismatch {
                kind: SymbolKind::Parameter,
                expected: self.num_parameters,
                got: parameters.len(),
            });
        }
        Ok(())
    }

    fn forward(&self, decision: &[f64], parameters: &[f64]) -> Vec<f64> {
        let mut values: Vec<f64> = Vec::with_capacity(self.instructions.len());
        for instruction in &self.instructions {
            let v = match *instruction {
                Instruction::Const(c) => c,
                Instruction::Symbol(s) => match s.kind {
                    SymbolKind::Decision => decision[s.index],
                    SymbolKind::Parameter => parameters[s.index],
                },
                Instruction::Neg(a) => -values[a],
                Instruction::Add(a, b) => values[a] + values[b],
                Instruction::Sub(a, b) => values[a] - values[b],
                Instruction::Mul(a, b) => values[a] * values[b],
                Instruction::Max(a, b) => values[a].max(values[b]),
            };
            values.push(v);
        }
        values
    }

    /// Forward pass
    pub fn eval(&self, decision: &[f64], parameters: &[f64]) -> Result<f64, SymbolicError> {
        self.check_inputs(decision, parameters)?;
        let values = self.forward(decision, parameters);
        Ok(values.last().copied().unwrap_or(0.0))
    }

    /// Value and gradient with respect to the decision vector
    ///
    /// `grad` is overwritten. For `max(a, b)` with `a == b` the adjoint goes to
    /// `a`; for a hinge `max(0, h)` this is the zero subgradient on the kink.
    pub fn gradient(
        &self,
        decision: &[f64],
        parameters: &[f64],
        grad: &mut [f64],
    ) -> Result<f64, SymbolicError> {
        self.check_inputs(decision, parameters)?;
        if grad.len() != self.num_decision {
            return Err(SymbolicError::LengthMismatch {
                kind: SymbolKind::Decision,
                expected: self.num_decision,
                got: grad.len(),
            });
        }

        let values = self.forward(decision, parameters);
        grad.iter_mut().for_each(|g| *g = 0.0);
        if values.is_empty() {
            return Ok(0.0);
        }

        let mut adjoint = vec![0.0; values.len()];
        let output = values.len() - 1;
        adjoint[output] = 1.0;

        for k in (0..self.instructions.len()).rev() {
            let g = adjoint[k];
            if g == 0.0 {
                continue;
            }
            match self.instructions[k] {
                Instruction::Const(_) => {}
                Instruction::Symbol(s) => {
                    if s.kind == SymbolKind::Decision {
                        grad[s.index] += g;
                    }
                }
                Instruction::Neg(a) => adjoint[a] -= g,
                Instruction::Add(a, b) => {
                    adjoint[a] += g;
                    adjoint[b] += g;
                }
                Instruction::Sub(a, b) => {
                    adjoint[a] += g;
                    adjoint[b] -= g;
                }
                Instruction::Mul(a, b) => {
                    adjoint[a] += g * values[b];
                    adjoint[b] += g * values[a];
                }
                Instruction::Max(a, b) => {
                    if values[a] >= values[b] {
                        adjoint[a] += g;
                    } else {
                        adjoint[b] += g;
                    }
                }
            }
        }

        Ok(values[output])
    }
}
