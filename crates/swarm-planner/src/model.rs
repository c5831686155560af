//! Trajectory cost model builder
//!
//! Unrolls the single-integrator swarm model over the horizon and accumulates
//!
//! ```text
//! J = Σₜ Σᵢ ( q_x ‖pᵢ(t) - rᵢ‖² + q_u ‖uᵢ(t)‖² )      stage
//!   + Σₜ q_bet · Σ_pairs max(0, d_MAV - ‖pᵢ(t+1) - pⱼ(t+1)‖²)   collision
//!   + Σᵢ q_n ‖pᵢ(N) - rᵢ‖²                             terminal
//! pᵢ(t+1) = pᵢ(t) + ts · uᵢ(t)[0..3]
//! ```
//!
//! over a symbolic decision vector `u` and parameter vector `z0`
//! (see [`crate::layout`]).

use serde::{Deserialize, Serialize};
use tracing::debug;

use swarm_core::math::EulerIntegrable;
use swarm_core::{Expr, SymVec3, SymbolKind, SymbolicError, SymbolicVector, Tape};

use crate::collision::CollisionPenalty;
use crate::config::{PlannerConfig, SwarmDimensions};
use crate::error::ModelError;
use crate::layout::ProblemLayout;

/// Per-term split of the cost
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown<T> {
    /// Running position tracking (q_x)
    pub tracking: T,
    /// Control effort (q_u)
    pub effort: T,
    /// Inter-vehicle collision penalty (q_bet)
    pub collision: T,
    /// Terminal position tracking (q_n)
    pub terminal: T,
}

impl CostBreakdown<f64> {
    pub fn total(&self) -> f64 {
        self.tracking + self.effort + self.collision + self.terminal
    }
}

impl CostBreakdown<Expr> {
    fn zero() -> Self {
        Self {
            tracking: Expr::zero(),
            effort: Expr::zero(),
            collision: Expr::zero(),
            terminal: Expr::zero(),
        }
    }

    pub fn total(&self) -> Expr {
        &self.tracking + &self.effort + &self.collision + &self.terminal
    }

    pub fn eval(&self, decision: &[f64], parameters: &[f64]) -> Result<CostBreakdown<f64>, SymbolicError> {
        Ok(CostBreakdown {
            tracking: self.tracking.eval(decision, parameters)?,
            effort: self.effort.eval(decision, parameters)?,
            collision: self.collision.eval(decision, parameters)?,
            terminal: self.terminal.eval(decision, parameters)?,
        })
    }
}

/// Box constraint on the decision vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxBounds {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl BoxBounds {
    pub fn uniform(len: usize, min: f64, max: f64) -> Self {
        Self {
            min: vec![min; len],
            max: vec![max; len],
        }
    }

    pub fn len(&self) -> usize {
        self.min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    /// Whether every element of `u` lies within its bounds
    pub fn contains(&self, u: &[f64]) -> bool {
        u.len() == self.len()
            && u
                .iter()
                .zip(self.min.iter().zip(self.max.iter()))
                .all(|(x, (lo, hi))| lo <= x && x <= hi)
    }

    /// Clamp `u` onto the box
    pub fn project(&self, u: &mut [f64]) {
        for (x, (lo, hi)) in u.iter_mut().zip(self.min.iter().zip(self.max.iter())) {
            *x = x.clamp(*lo, *hi);
        }
    }
}

/// Output of the builder: symbols, cost and bounds
#[derive(Debug, Clone)]
pub struct CostModel {
    layout: ProblemLayout,
    decision: SymbolicVector,
    parameters: SymbolicVector,
    terms: CostBreakdown<Expr>,
    cost: Expr,
    bounds: BoxBounds,
}

impl CostModel {
    pub fn layout(&self) -> &ProblemLayout {
        &self.layout
    }

    /// Decision vector `u`
    pub fn decision(&self) -> &SymbolicVector {
        &self.decision
    }

    /// Parameter vector `z0`
    pub fn parameters(&self) -> &SymbolicVector {
        &self.parameters
    }

    pub fn cost(&self) -> &Expr {
        &self.cost
    }

    pub fn terms(&self) -> &CostBreakdown<Expr> {
        &self.terms
    }

    pub fn bounds(&self) -> &BoxBounds {
        &self.bounds
    }

    /// `(u, z0, cost, umin, umax)`
    pub fn into_parts(self) -> (SymbolicVector, SymbolicVector, Expr, Vec<f64>, Vec<f64>) {
        (
            self.decision,
            self.parameters,
            self.cost,
            self.bounds.min,
            self.bounds.max,
        )
    }

    pub fn evaluate(&self, decision: &[f64], parameters: &[f64]) -> Result<f64, ModelError> {
        Ok(self.compile()?.eval(decision, parameters)?)
    }

    pub fn evaluate_terms(
        &self,
        decision: &[f64],
        parameters: &[f64],
    ) -> Result<CostBreakdown<f64>, ModelError> {
        self.check_inputs(decision, parameters)?;
        Ok(self.terms.eval(decision, parameters)?)
    }

    /// Compile the cost for repeated evaluation and differentiation
    pub fn compile(&self) -> Result<Tape, ModelError> {
        Ok(Tape::compile(
            &self.cost,
            self.layout.decision_len(),
            self.layout.parameter_len(),
        )?)
    }

    fn check_inputs(&self, decision: &[f64], parameters: &[f64]) -> Result<(), ModelError> {
        for (kind, expected, got) in [
            (SymbolKind::Decision, self.layout.decision_len(), decision.len()),
            (SymbolKind::Parameter, self.layout.parameter_len(), parameters.len()),
        ] {
            if expected != got {
                return Err(SymbolicError::LengthMismatch { kind, expected, got }.into());
            }
        }
        Ok(())
    }
}

/// Builds a [`CostModel`] from a validated [`PlannerConfig`]
#[derive(Debug, Clone, Default)]
pub struct CostModelBuilder {
    config: PlannerConfig,
}

impl CostModelBuilder {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Unroll the swarm over the horizon and assemble the cost
    ///
    /// # Returns
    /// The symbolic decision and parameter vectors, the per-term and total
    /// cost expressions and the box bounds. Every [`ModelError`] is raised by
    /// validation before the first expression is created.
    pub fn build(&self) -> Result<CostModel, ModelError> {
        self.config.validate()?;

        let config = &self.config;
        let layout = ProblemLayout::from_config(config);
        let weights = &config.weights;
        let ts = config.horizon.time_step;
        debug!(
            num_steps = layout.num_steps,
            num_vehicles = layout.num_vehicles,
            state_dim = layout.state_dim,
            control_dim = layout.control_dim,
            aggregation = %config.collision.aggregation,
            "building swarm cost model"
        );

        let u = SymbolicVector::new("u", SymbolKind::Decision, layout.decision_len());
        let z0 = SymbolicVector::new("z0", SymbolKind::Parameter, layout.parameter_len());

        let mut positions = Vec::with_capacity(layout.num_vehicles);
        let mut references = Vec::with_capacity(layout.num_vehicles);
        for i in 0..layout.num_vehicles {
            positions.push(position_of(&z0, layout.initial_state_range(i).start, "state")?);
            references.push(position_of(&z0, layout.reference_state_range(i).start, "state")?);
        }

        let penalty = CollisionPenalty::from_weights(weights, config.collision.aggregation);
        let mut terms = CostBreakdown::<Expr>::zero();

        for t in 0..layout.num_steps {
            for i in 0..layout.num_vehicles {
                terms.tracking += weights.q_x * positions[i].distance_squared(&references[i]);

                let u_t = &u.as_slice()[layout.control_range(i, t)];
                terms.effort += weights.q_u * sum_of_squares(u_t);

                let velocity = SymVec3::from_slice(u_t).ok_or(ModelError::InvalidDimension {
                    name: "control",
                    value: u_t.len(),
                    min: SwarmDimensions::MIN_CHANNELS,
                })?;
                positions[i].euler_step(&velocity, ts);
            }

            terms.collision += penalty.symbolic(&positions);
        }

        for (position, reference) in positions.iter().zip(references.iter()) {
            terms.terminal += weights.q_n * position.distance_squared(reference);
        }

        let cost = terms.total();
        let bounds = BoxBounds::uniform(layout.decision_len(), config.bounds.min, config.bounds.max);
        debug!(
            decision_len = u.len(),
            parameter_len = z0.len(),
            "swarm cost model built"
        );

        Ok(CostModel {
            layout,
            decision: u,
            parameters: z0,
            terms,
            cost,
            bounds,
        })
    }
}

/// Build the cost model for `config`
pub fn build_cost_model(config: &PlannerConfig) -> Result<CostModel, ModelError> {
    CostModelBuilder::new(config.clone()).build()
}

fn position_of(z0: &SymbolicVector, start: usize, name: &'static str) -> Result<SymVec3, ModelError> {
    z0.slice(start..start + SwarmDimensions::MIN_CHANNELS)
        .and_then(SymVec3::from_slice)
        .ok_or(ModelError::InvalidDimension {
            name,
            value: z0.len(),
            min: SwarmDimensions::MIN_CHANNELS,
        })
}

fn sum_of_squares(values: &[Expr]) -> Expr {
    values.iter().fold(Expr::zero(), |acc, v| acc + v * v)
}
