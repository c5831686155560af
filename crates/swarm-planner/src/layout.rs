//! Decision and parameter vector layout
//!
//! Decision vector `u` (length `nu·N·N_MAV`), grouped per vehicle, then per
//! step, then per channel:
//!
//! ```text
//! u = [u₀(0) .. u₀(N-1) | u₁(0) .. u₁(N-1) | ...]      uᵢ(t) ∈ ℝ^nu
//! index(i, t, k) = i·nu·N + t·nu + k
//! ```
//!
//! Parameter vector `z0` (length `2·nx·N_MAV`), initial states first, then
//! reference states:
//!
//! ```text
//! z0 = [x₀ x₁ .. x_{N_MAV-1} | r₀ r₁ .. r_{N_MAV-1}]   xᵢ, rᵢ ∈ ℝ^nx
//! ```

use std::ops::Range;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemLayout {
    /// Horizon steps (N)
    pub num_steps: usize,
    /// Vehicles (N_MAV)
    pub num_vehicles: usize,
    /// State channels per vehicle (nx)
    pub state_dim: usize,
    /// Control channels per vehicle (nu)
    pub control_dim: usize,
}

impl ProblemLayout {
    pub fn new(num_steps: usize, num_vehicles: usize, state_dim: usize, control_dim: usize) -> Self {
        Self {
            num_steps,
            num_vehicles,
            state_dim,
            control_dim,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(
            config.horizon.num_steps,
            config.dimensions.num_vehicles,
            config.dimensions.state_dim,
            config.dimensions.control_dim,
        )
    }

    /// Reject layouts whose vector lengths do not fit in `usize`
    ///
    /// Every index method below assumes this holds.
    pub fn check_size(&self) -> Result<(), ModelError> {
        let decision = self
            .control_dim
            .checked_mul(self.num_steps)
            .and_then(|n| n.checked_mul(self.num_vehicles));
        if decision.is_none() {
            return Err(ModelError::ProblemTooLarge {
                what: "decision vector",
            });
        }
        let parameters = self
            .state_dim
            .checked_mul(self.num_vehicles)
            .and_then(|n| n.checked_mul(2));
        if parameters.is_none() {
            return Err(ModelError::ProblemTooLarge {
                what: "parameter vector",
            });
        }
        Ok(())
    }

    /// Decision vector length `nu·N·N_MAV`
    pub fn decision_len(&self) -> usize {
        self.control_dim * self.num_steps * self.num_vehicles
    }

    /// Parameter vector length `2·nx·N_MAV`
    pub fn parameter_len(&self) -> usize {
        2 * self.state_dim * self.num_vehicles
    }

    /// Offset of vehicle `vehicle`'s input at step `step`
    pub fn control_offset(&self, vehicle: usize, step: usize) -> usize {
        vehicle * self.control_dim * self.num_steps + step * self.control_dim
    }

    pub fn control_index(&self, vehicle: usize, step: usize, channel: usize) -> usize {
        self.control_offset(vehicle, step) + channel
    }

    pub fn control_range(&self, vehicle: usize, step: usize) -> Range<usize> {
        let start = self.control_offset(vehicle, step);
        start..start + self.control_dim
    }

    pub fn initial_state_range(&self, vehicle: usize) -> Range<usize> {
        let start = vehicle * self.state_dim;
        start..start + self.state_dim
    }

    pub fn reference_state_range(&self, vehicle: usize) -> Range<usize> {
        let start = self.num_vehicles * self.state_dim + vehicle * self.state_dim;
        start..start + self.state_dim
    }

    /// Pack initial and reference positions into a parameter vector
    ///
    /// # Arguments
    /// * `initial` - Initial position of each vehicle
    /// * `reference` - Reference position of each vehicle
    ///
    /// # Returns
    /// `z0` of length `2·nx·N_MAV`; state channels beyond the first three are
    /// zero. Fails with [`ModelError::LengthMismatch`] unless both slices hold
    /// one position per vehicle.
    pub fn pack_parameters(
        &self,
        initial: &[Vector3<f64>],
        reference: &[Vector3<f64>],
    ) -> Result<Vec<f64>, ModelError> {
        for (what, positions) in [("initial position", initial), ("reference position", reference)] {
            if positions.len() != self.num_vehicles {
                return Err(ModelError::LengthMismatch {
                    what,
                    expected: self.num_vehicles,
                    got: positions.len(),
                });
            }
        }

        let mut z0 = vec![0.0; self.parameter_len()];
        for i in 0..self.num_vehicles {
            let start = self.initial_state_range(i).start;
            z0[start..start + 3].copy_from_slice(initial[i].as_slice());
            let start = self.reference_state_range(i).start;
            z0[start..start + 3].copy_from_slice(reference[i].as_slice());
        }
        Ok(z0)
    }

    /// Initial and reference positions of every vehicle
    pub fn unpack_parameters(
        &self,
        z0: &[f64],
    ) -> Result<(Vec<Vector3<f64>>, Vec<Vector3<f64>>), ModelError> {
        self.check_len("parameter vector", self.parameter_len(), z0.len())?;
        let position = |range: Range<usize>| Vector3::from_column_slice(&z0[range.start..range.start + 3]);
        let initial = (0..self.num_vehicles)
            .map(|i| position(self.initial_state_range(i)))
            .collect();
        let reference = (0..self.num_vehicles)
            .map(|i| position(self.reference_state_range(i)))
            .collect();
        Ok((initial, reference))
    }

    /// Velocity part (first three channels) of every input, `[vehicle][step]`
    pub fn unpack_velocities(&self, u: &[f64]) -> Result<Vec<Vec<Vector3<f64>>>, ModelError> {
        self.check_len("decision vector", self.decision_len(), u.len())?;
        Ok((0..self.num_vehicles)
            .map(|i| {
                (0..self.num_steps)
                    .map(|t| {
                        let start = self.control_offset(i, t);
                        Vector3::from_column_slice(&u[start..start + 3])
                    })
                    .collect()
            })
            .collect())
    }

    fn check_len(&self, what: &'static str, expected: usize, got: usize) -> Result<(), ModelError> {
        if expected != got {
            return Err(ModelError::LengthMismatch {
                what,
                expected,
                got,
            });
        }
        Ok(())
    }
}
