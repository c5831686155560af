//! Numeric rollout of the swarm model
//!
//! Simulates every vehicle with nalgebra vectors for a given decision and
//! parameter vector and accumulates the same cost terms as the symbolic
//! model. Used to inspect a candidate control sequence and to cross-check
//! [`crate::model::CostModel`].

use nalgebra::Vector3;
use swarm_core::math::integrate_euler;

use crate::collision::{CollisionPenalty, SeparationReport};
use crate::config::PlannerConfig;
use crate::error::ModelError;
use crate::layout::ProblemLayout;
use crate::model::CostBreakdown;

/// Simulated swarm trajectory with its cost
#[derive(Debug, Clone)]
pub struct Rollout {
    /// `positions[i][t]`, `N + 1` entries per vehicle
    pub positions: Vec<Vec<Vector3<f64>>>,
    /// Reference position per vehicle
    pub references: Vec<Vector3<f64>>,
    /// Separation check after each step (`N` entries)
    pub separations: Vec<SeparationReport>,
    pub terms: CostBreakdown<f64>,
}

impl Rollout {
    /// Simulate the swarm and accumulate the cost terms
    ///
    /// # Arguments
    /// * `config` - Planner configuration (validated here)
    /// * `decision` - Control inputs, laid out as the decision vector `u`
    /// * `parameters` - Initial and reference states, laid out as `z0`
    ///
    /// # Returns
    /// Trajectories, per-step separation reports and the cost breakdown, or a
    /// [`ModelError`] if the configuration or vector lengths are invalid
    pub fn simulate(
        config: &PlannerConfig,
        decision: &[f64],
        parameters: &[f64],
    ) -> Result<Self, ModelError> {
        config.validate()?;

        let layout = ProblemLayout::from_config(config);
        let weights = &config.weights;
        let ts = config.horizon.time_step;
        let (initial, references) = layout.unpack_parameters(parameters)?;
        let velocities = layout.unpack_velocities(decision)?;
        let penalty = CollisionPenalty::from_weights(weights, config.collision.aggregation);

        let positions: Vec<Vec<Vector3<f64>>> = initial
            .iter()
            .zip(velocities.iter())
            .map(|(x0, v)| integrate_euler(x0, v, ts))
            .collect();

        let mut separations = Vec::with_capacity(layout.num_steps);
        let mut terms = CostBreakdown::<f64>::default();

        for t in 0..layout.num_steps {
            for i in 0..layout.num_vehicles {
                terms.tracking += weights.q_x * (positions[i][t] - references[i]).norm_squared();

                let u_t = &decision[layout.control_range(i, t)];
                terms.effort += weights.q_u * u_t.iter().map(|x| x * x).sum::<f64>();
            }

            let after_step: Vec<Vector3<f64>> = positions.iter().map(|p| p[t + 1]).collect();
            terms.collision += penalty.numeric(&after_step);
            separations.push(SeparationReport::evaluate(&after_step, weights.d_mav));
        }

        for (trajectory, reference) in positions.iter().zip(references.iter()) {
            terms.terminal += weights.q_n * (trajectory[layout.num_steps] - reference).norm_squared();
        }

        Ok(Self {
            positions,
            references,
            separations,
            terms,
        })
    }

    pub fn total_cost(&self) -> f64 {
        self.terms.total()
    }

    /// Final position of every vehicle
    pub fn final_positions(&self) -> Vec<Vector3<f64>> {
        self.positions
            .iter()
            .filter_map(|trajectory| trajectory.last().copied())
            .collect()
    }

    /// Smallest squared inter-vehicle distance over the horizon
    pub fn min_separation_squared(&self) -> Option<f64> {
        self.separations
            .iter()
            .filter_map(SeparationReport::min_distance_squared)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Whether no pair enters the collision threshold at any step
    pub fn collision_free(&self) -> bool {
        self.separations.iter().all(|report| report.all_clear)
    }
}
